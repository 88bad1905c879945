//! 粒子堆
//!
//! 一个效果在一个渲染通道内的运行时粒子池：拥有一个按掩码分配的
//! [`ParticleBuffer`]，推进粒子年龄、交换移除死亡粒子，并把存活区间
//! `[0, live_count)` 作为 GPU 上传源暴露给渲染层。
//!
//! ## 生命周期
//!
//! ```text
//! active（≥1 个链接）⇄ draining（0 链接，宽限期内）→ expired（可回收）
//! ```
//!
//! 多个发射器通过 link/unlink 共享同一个堆；容量由
//! `链接数 × 效果的最大粒子数` 派生，增长按 2 倍摊销并受硬上限约束。
//! 宽限期按最后一个解除链接的效果最大寿命换算成帧数，使粒子在发射器
//! 消失后仍能自然死完。
//!
//! 所有失败都是非致命的：容量耗尽丢弃余量并记日志，非法 dt 跳过本帧，
//! 未知 owner/emitter 记警告不改状态。粒子效果绝不允许拖垮一帧。

use std::collections::{HashMap, HashSet};

use glam::{Vec3, Vec4};

use crate::core::stats;
use crate::particles::buffer::ParticleBuffer;
use crate::particles::effect::{EffectDefinition, EffectId, ParticleInitList};
use crate::particles::property::ParticleProperty;
use crate::particles::{EmitterId, MaterialId, OwnerId};

/// 单个堆的容量硬上限（元素槽位）
pub const HEAP_CAPACITY_LIMIT: usize = 1000;

/// 宽限期换算系数：每秒最大粒子寿命折合的帧数
const GRACE_TICKS_PER_LIFETIME_SECOND: f32 = 20.0;

/// 容量变更后派生索引缓冲重建的缓冲帧数
const RESIZE_SETTLE_FRAMES: u8 = 2;

/// 粒子堆
pub struct ParticleHeap {
    effect: EffectId,
    material: MaterialId,
    buffer: ParticleBuffer,
    live_count: usize,
    /// 当前绑定到此堆的发射器集合
    links: HashSet<EmitterId>,
    /// 创建者标识 → 存活粒子引用计数
    owners: HashMap<OwnerId, u32>,
    /// 链接清空时盖下的绝对过期帧号
    expiry_tick: Option<u64>,
    /// 容量变更后尚未安定的帧数（派生索引缓冲在此期间需重建）
    pending_resize: u8,
    /// 效果最大粒子数的快照（检测运行期配置增长）
    max_particles: usize,
    /// 效果最大粒子寿命的快照（宽限期换算）
    max_lifetime: f32,
}

impl ParticleHeap {
    /// 按效果的掩码和粒子数上界创建堆
    pub fn new(effect: &EffectDefinition) -> Self {
        let max_particles = effect.max_particles() as usize;
        let capacity = max_particles.clamp(1, HEAP_CAPACITY_LIMIT);
        Self {
            effect: effect.id(),
            material: effect.material(),
            buffer: ParticleBuffer::new(effect.mask(), capacity),
            live_count: 0,
            links: HashSet::new(),
            owners: HashMap::new(),
            expiry_tick: None,
            pending_resize: 0,
            max_particles,
            max_lifetime: effect.max_lifetime(),
        }
    }

    pub fn effect_id(&self) -> EffectId {
        self.effect
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn buffer(&self) -> &ParticleBuffer {
        &self.buffer
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// 容量变更后，派生的 GPU 索引缓冲是否仍需重建
    pub fn needs_index_rebuild(&self) -> bool {
        self.pending_resize > 0
    }

    /// 堆是否已过宽限期、可被回收（0 链接且过期帧已到）
    pub fn is_expired(&self, now_tick: u64) -> bool {
        self.links.is_empty() && self.expiry_tick.map_or(false, |tick| now_tick >= tick)
    }

    /// 绑定一个发射器
    ///
    /// 重复绑定是无操作。链接数增长使所需容量超过当前容量时，
    /// 扩容到所需的 2 倍（受硬上限约束）并保留现有粒子。
    pub fn link(&mut self, emitter: EmitterId, effect: &EffectDefinition) {
        if !self.links.insert(emitter) {
            return;
        }
        self.expiry_tick = None;
        self.max_particles = effect.max_particles() as usize;
        self.max_lifetime = effect.max_lifetime();

        let required = self.links.len() * self.max_particles;
        if required > self.buffer.capacity() {
            // 硬上限处 grown == capacity：不重分配也不重新盖重建标记
            let grown = (required * 2).min(HEAP_CAPACITY_LIMIT);
            if grown > self.buffer.capacity() {
                self.buffer.resize_copy(grown);
                self.pending_resize = RESIZE_SETTLE_FRAMES;
            }
        }
    }

    /// 解除一个发射器的绑定
    ///
    /// 最后一个链接解除时盖下过期帧号；其粒子继续模拟到自然死亡。
    pub fn unlink(&mut self, emitter: EmitterId, now_tick: u64) {
        if !self.links.remove(&emitter) {
            log::warn!("unlink for emitter {:?} that is not linked to this heap", emitter);
            return;
        }
        if self.links.is_empty() {
            let grace = (self.max_lifetime * GRACE_TICKS_PER_LIFETIME_SECOND).ceil() as u64;
            self.expiry_tick = Some(now_tick + grace);
        }
    }

    /// 推进一帧模拟
    ///
    /// `dt` 超出 `(0, 1]` 时整帧跳过（软失败，防止暂停/恢复的时钟跳变）。
    /// 效果的配置粒子数在运行期涨过当前容量时做硬重置：扩容、丢弃全部
    /// 粒子并提前返回——配置变更使旧粒子的语义失效。
    pub fn process(&mut self, dt: f32, effect: &EffectDefinition) {
        if dt <= 0.0 || dt > 1.0 {
            log::debug!("skipping particle frame: dt {} outside (0, 1]", dt);
            return;
        }

        let configured = effect.max_particles() as usize;
        if configured > self.buffer.capacity() {
            let required = (self.links.len().max(1) * configured).min(HEAP_CAPACITY_LIMIT);
            self.buffer.resize(required);
            self.live_count = 0;
            self.owners.clear();
            self.max_particles = configured;
            self.max_lifetime = effect.max_lifetime();
            self.pending_resize = RESIZE_SETTLE_FRAMES;
            return;
        }

        let mut index = 0;
        while index < self.live_count {
            let time = self.buffer.get::<f32>(ParticleProperty::Time, index) + dt;
            *self.buffer.get_mut::<f32>(ParticleProperty::Time, index) = time;

            let lifetime = self.buffer.get::<f32>(ParticleProperty::Lifetime, index);
            if time >= lifetime {
                // 交换移除；换进来的尾部粒子本帧仍需评估，下标不前进
                self.kill_at(index);
                continue;
            }

            let pct = time / lifetime;
            let process_time = self.buffer.get::<f32>(ParticleProperty::ProcessTime, index);
            if process_time < 0.0 || pct < process_time {
                for module in effect.modules() {
                    module.update_particle(&mut self.buffer, index, dt, pct);
                }
            } else {
                // 模拟窗口已关闭：画面冻结在阈值处，但粒子继续老化至死亡
                for module in effect.modules() {
                    module.update_particle(&mut self.buffer, index, 0.0, process_time);
                }
            }
            index += 1;
        }

        if self.pending_resize > 0 {
            self.pending_resize -= 1;
        }

        stats::add_live_particles(self.live_count);
        stats::add_heap_bytes(self.buffer.byte_size());
    }

    fn kill_at(&mut self, index: usize) {
        let owner = OwnerId(self.buffer.get::<u64>(ParticleProperty::Owner, index));
        let last = self.live_count - 1;
        self.buffer.swap(index, last);
        self.live_count = last;
        self.release_owner(owner);
    }

    fn release_owner(&mut self, owner: OwnerId) {
        match self.owners.get_mut(&owner) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.owners.remove(&owner);
                }
            }
            None => log::warn!("owner {:?} missing from heap refcount map", owner),
        }
    }

    /// 生成一批粒子
    ///
    /// 容量耗尽时丢弃余量（记日志，非致命）。返回实际接受的粒子数。
    pub fn add_particles(&mut self, list: &ParticleInitList) -> usize {
        let mut accepted = 0;
        for init in &list.items {
            if self.live_count == self.buffer.capacity() {
                log::warn!(
                    "particle heap at capacity ({}): dropping {} initializers",
                    self.buffer.capacity(),
                    list.items.len() - accepted
                );
                break;
            }

            let index = self.live_count;
            *self.buffer.get_mut::<f32>(ParticleProperty::Time, index) = 0.0;
            *self.buffer.get_mut::<f32>(ParticleProperty::Lifetime, index) = init.lifetime;
            *self.buffer.get_mut::<f32>(ParticleProperty::ProcessTime, index) =
                init.process_time;
            *self.buffer.get_mut::<Vec3>(ParticleProperty::Position, index) = init.position;
            *self.buffer.get_mut::<u64>(ParticleProperty::Owner, index) = list.owner.0;

            for item in &init.overrides {
                if !self.buffer.has(item.property) {
                    continue;
                }
                if let Err(err) = self.buffer.write_raw(item.property, index, &item.data) {
                    log::warn!("dropping bad property override: {}", err);
                }
            }

            let tint = list.tint * init.tint;
            if self.buffer.has(ParticleProperty::Color) {
                *self.buffer.get_mut::<Vec4>(ParticleProperty::Color, index) *= tint;
            }
            if self.buffer.has(ParticleProperty::ColorRange) {
                *self
                    .buffer
                    .get_mut::<Vec4>(ParticleProperty::ColorRange, index) *= tint;
            }
            if self.buffer.has(ParticleProperty::Velocity) {
                let velocity = self.buffer.get::<Vec3>(ParticleProperty::Velocity, index);
                *self.buffer.get_mut::<Vec3>(ParticleProperty::Velocity, index) =
                    init.rotation * velocity;
            }

            *self.owners.entry(list.owner).or_insert(0) += 1;
            self.live_count += 1;
            accepted += 1;
        }
        accepted
    }

    /// 移除指定创建者的全部存活粒子，返回移除数
    ///
    /// 与自然死亡相同的交换移除，但不触碰年龄/寿命；
    /// 之后无条件清除该 owner 的引用计数条目。
    pub fn remove_particles_by_owner(&mut self, owner: OwnerId) -> usize {
        if !self.owners.contains_key(&owner) {
            log::warn!("remove_particles_by_owner: unknown owner {:?}", owner);
            return 0;
        }

        let mut removed = 0;
        let mut index = 0;
        while index < self.live_count {
            if self.buffer.get::<u64>(ParticleProperty::Owner, index) == owner.0 {
                let last = self.live_count - 1;
                self.buffer.swap(index, last);
                self.live_count = last;
                removed += 1;
            } else {
                index += 1;
            }
        }
        self.owners.remove(&owner);
        removed
    }

    /// 指定创建者是否还有存活粒子（O(1)，发射器拆除前的安全检查）
    pub fn has_active_particles(&self, owner: OwnerId) -> bool {
        self.owners.get(&owner).map_or(false, |count| *count > 0)
    }
}
