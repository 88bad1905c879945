use glam::{Vec3, Vec4};
use particle_engine::core::stats;
use particle_engine::particles::{
    ColorFadeModule, EffectDefinition, EmissionPolicy, EmitterId, KinematicsModule, OwnerId,
    ParticleHeapCollection, RenderPassId, SpawnParams, TintRange, ValueRange,
};
use particle_engine::render::{HeapBufferSource, VertexLayout};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// 测试内启用日志输出（RUST_LOG=debug 可观察堆创建/回收日志）
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spark_effect() -> EffectDefinition {
    let mut effect = EffectDefinition::new("sparks", EmissionPolicy::Infinite { rate: 40.0 });
    effect.set_lifetime(ValueRange::new(0.2, 0.5));
    effect.push_module(Box::new(KinematicsModule {
        velocity_min: Vec3::new(-1.0, 1.0, -1.0),
        velocity_max: Vec3::new(1.0, 3.0, 1.0),
        acceleration: Vec3::new(0.0, -9.81, 0.0),
    }));
    effect.push_module(Box::new(ColorFadeModule {
        start: TintRange::fixed(Vec4::ONE),
        end: Vec4::new(1.0, 0.5, 0.0, 0.0),
    }));
    effect
}

/// 完整帧循环：两个发射器共享一个堆，发射、模拟、填充顶点、
/// 解除链接后经过宽限期回收。
#[test]
fn test_full_frame_loop_with_shared_heap() {
    init_logging();
    let effect = spark_effect();
    let mut pool = ParticleHeapCollection::new();
    let pass = RenderPassId(0);
    let mut rng = StdRng::seed_from_u64(99);

    let emitters = [EmitterId(1), EmitterId(2)];
    let owners = [OwnerId(1), OwnerId(2)];
    for emitter in emitters {
        pool.heap_mut(&effect, pass).link(emitter, &effect);
    }
    assert_eq!(pool.heap_count(), 1);

    // 每个发射器一个累加器
    let mut accumulators = [0.0f32; 2];
    let dt = 0.016;
    for _ in 0..30 {
        pool.advance_frame();
        stats::reset_frame();

        for (slot, owner) in owners.iter().enumerate() {
            let count = effect.emission().emit_count(dt, &mut accumulators[slot]);
            if count > 0 {
                let list =
                    effect.create_particles(*owner, count, &SpawnParams::default(), &mut rng);
                pool.heap_mut(&effect, pass).add_particles(&list);
            }
        }
        pool.heap_mut(&effect, pass).process(dt, &effect);
        pool.clear_unused_heaps();
    }

    let heap = pool.heap(&effect, pass).unwrap();
    assert!(heap.live_count() > 0);
    assert!(heap.capacity() >= heap.live_count());
    assert!(stats::frame_snapshot().total_particles >= heap.live_count());

    // 渲染层拉取缓冲
    let mut vertices = vec![0u8; heap.vertex_buffer_size()];
    let mut indices = vec![0u8; heap.index_buffer_size()];
    let layout = VertexLayout::particle_quad();
    let written = heap.fill_vertices(&mut vertices, &layout).unwrap();
    assert_eq!(written, heap.live_count() * 4 * layout.stride);
    heap.fill_indices(&mut indices).unwrap();
    assert_eq!(heap.draw_params().index_count as usize, heap.live_count() * 6);

    // 两个发射器都还有存活粒子
    assert!(heap.has_active_particles(OwnerId(1)));
    assert!(heap.has_active_particles(OwnerId(2)));

    // 解除全部链接，宽限期后回收
    let now = pool.tick();
    for emitter in emitters {
        pool.heap_mut(&effect, pass).unlink(emitter, now);
    }
    // 宽限期 = 0.5 秒最大寿命 × 20 = 10 帧
    for _ in 0..9 {
        pool.advance_frame();
        pool.clear_unused_heaps();
    }
    assert_eq!(pool.heap_count(), 1);
    pool.advance_frame();
    pool.clear_unused_heaps();
    assert_eq!(pool.heap_count(), 0);
}

/// 发射器拆除协议：先按 owner 批量移除，再解除链接。
#[test]
fn test_emitter_teardown_removes_owned_particles() {
    init_logging();
    let effect = spark_effect();
    let mut pool = ParticleHeapCollection::new();
    let pass = RenderPassId(0);
    let mut rng = StdRng::seed_from_u64(5);

    let heap = pool.heap_mut(&effect, pass);
    heap.link(EmitterId(9), &effect);
    let list = effect.create_particles(OwnerId(9), 6, &SpawnParams::default(), &mut rng);
    assert_eq!(heap.add_particles(&list), 6);
    assert!(heap.has_active_particles(OwnerId(9)));

    let removed = heap.remove_particles_by_owner(OwnerId(9));
    assert_eq!(removed, 6);
    assert!(!heap.has_active_particles(OwnerId(9)));
    assert_eq!(heap.live_count(), 0);
}

proptest! {
    /// 累加器守恒：任意帧切分下发射总数与连续时间理想值至多差 1。
    #[test]
    fn prop_accumulator_conservation(
        rate in 1.0f32..200.0,
        steps in proptest::collection::vec(0.001f32..0.25, 1..50),
    ) {
        let policy = EmissionPolicy::Infinite { rate };
        let mut accumulator = 0.0f32;
        let mut emitted: u64 = 0;
        let mut elapsed = 0.0f32;
        for dt in &steps {
            emitted += u64::from(policy.emit_count(*dt, &mut accumulator));
            elapsed += dt;
        }
        let ideal = (f64::from(rate) * f64::from(elapsed)).floor() as i64;
        let diff = (emitted as i64 - ideal).abs();
        prop_assert!(diff <= 1, "emitted {} vs ideal {}", emitted, ideal);
    }

    /// 交换移除保持存活集合：死亡只移除到期粒子，幸存者一个不丢。
    #[test]
    fn prop_swap_removal_preserves_live_set(
        lifetimes in proptest::collection::vec(0.1f32..5.0, 1..20),
        frames in 1usize..40,
    ) {
        let mut effect = EffectDefinition::new(
            "prop_effect",
            EmissionPolicy::Burst { count: 32 },
        );
        effect.set_lifetime(ValueRange::fixed(1.0));
        let mut heap = particle_engine::particles::ParticleHeap::new(&effect);

        let mut rng = StdRng::seed_from_u64(11);
        let mut list = effect.create_particles(
            OwnerId(1),
            lifetimes.len() as u32,
            &SpawnParams::default(),
            &mut rng,
        );
        for (init, lifetime) in list.items.iter_mut().zip(&lifetimes) {
            init.lifetime = *lifetime;
        }
        prop_assert_eq!(heap.add_particles(&list), lifetimes.len());

        let dt = 0.05f32;
        for _ in 0..frames {
            heap.process(dt, &effect);
        }

        // 每个粒子的年龄都按同一 f32 序列累加
        let mut age = 0.0f32;
        for _ in 0..frames {
            age += dt;
        }
        let mut expected: Vec<f32> = lifetimes
            .iter()
            .copied()
            .filter(|lifetime| age < *lifetime)
            .collect();
        let mut survivors: Vec<f32> = (0..heap.live_count())
            .map(|i| {
                heap.buffer()
                    .get::<f32>(particle_engine::ParticleProperty::Lifetime, i)
            })
            .collect();
        expected.sort_by(f32::total_cmp);
        survivors.sort_by(f32::total_cmp);
        prop_assert_eq!(survivors, expected);
    }
}
