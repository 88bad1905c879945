//! 效果定义与粒子模块
//!
//! [`EffectDefinition`] 是一个粒子效果的逐帧不可变描述：发射策略、
//! 数值生成器和属性模块列表。派生数据（属性掩码、最大粒子数）在
//! 配置变更时重算一次，绝不逐帧重算。
//!
//! [`ParticleModule`] 是模块的统一接口：声明自己需要的属性，在生成
//! 时写入初始值，在每帧更新时推进属性。内置模块是简单的数值生成器，
//! 不属于核心算法。

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Quat, Vec3, Vec4};
use rand::{Rng, RngCore};

use crate::particles::property::{ParticleProperty, PropertyMask, BASE_MASK};
use crate::particles::{MaterialId, OwnerId, ParticleBuffer};

static NEXT_EFFECT_ID: AtomicU64 = AtomicU64::new(1);

/// 效果标识
///
/// 构造 [`EffectDefinition`] 时从进程级计数器分配，进程内稳定唯一，
/// 作为堆缓存的键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

// ============================================================================
// 数值生成器
// ============================================================================

/// 标量取值范围
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// 固定值（min == max）
    pub fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// 范围内均匀采样
    pub fn sample(&self, rng: &mut dyn RngCore) -> f32 {
        if self.min < self.max {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }
}

/// 生成位置的盒形区域（相对发射器原点）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRegion {
    pub half_extents: Vec3,
}

impl SpawnRegion {
    /// 点发射
    pub fn point() -> Self {
        Self {
            half_extents: Vec3::ZERO,
        }
    }

    pub fn new(half_extents: Vec3) -> Self {
        Self { half_extents }
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> Vec3 {
        let mut offset = Vec3::ZERO;
        for axis in 0..3 {
            let extent = self.half_extents[axis];
            if extent > 0.0 {
                offset[axis] = rng.gen_range(-extent..extent);
            }
        }
        offset
    }
}

/// 两个颜色之间的随机插值生成器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TintRange {
    pub from: Vec4,
    pub to: Vec4,
}

impl TintRange {
    pub fn fixed(color: Vec4) -> Self {
        Self {
            from: color,
            to: color,
        }
    }

    pub fn new(from: Vec4, to: Vec4) -> Self {
        Self { from, to }
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> Vec4 {
        self.from.lerp(self.to, rng.gen::<f32>())
    }
}

// ============================================================================
// 初始化记录
// ============================================================================

/// 单个属性的生成时覆写（不透明字节块 + 目标属性）
#[derive(Debug, Clone)]
pub struct PropertyOverride {
    pub property: ParticleProperty,
    pub data: Vec<u8>,
}

impl PropertyOverride {
    /// 从 POD 值构造覆写
    pub fn from_pod<T: bytemuck::Pod>(property: ParticleProperty, value: T) -> Self {
        Self {
            property,
            data: bytemuck::bytes_of(&value).to_vec(),
        }
    }
}

/// 单个粒子的初始化记录
#[derive(Debug, Clone)]
pub struct ParticleInit {
    pub lifetime: f32,
    pub position: Vec3,
    pub process_time: f32,
    /// 逐粒子色调（与整批色调相乘）
    pub tint: Vec4,
    /// 逐粒子朝向（应用到初速度上）
    pub rotation: Quat,
    /// 生成时模块写入的属性覆写
    pub overrides: Vec<PropertyOverride>,
}

/// 一批待生成粒子
#[derive(Debug, Clone)]
pub struct ParticleInitList {
    /// 创建者标识（按 owner 批量移除、引用计数用）
    pub owner: OwnerId,
    /// 整批色调
    pub tint: Vec4,
    pub items: Vec<ParticleInit>,
}

/// 发射器提供的生成参数（原点、朝向、整批色调）
#[derive(Debug, Clone, Copy)]
pub struct SpawnParams {
    pub origin: Vec3,
    pub rotation: Quat,
    pub tint: Vec4,
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            tint: Vec4::ONE,
        }
    }
}

// ============================================================================
// 粒子模块
// ============================================================================

/// 属性生成模块接口
///
/// 模块声明自己需要的属性掩码，在粒子生成时写入初始覆写，
/// 在每帧更新时按 `dt` / `pct`（归一化寿命进度）推进属性。
pub trait ParticleModule {
    fn name(&self) -> &'static str;

    /// 模块需要的属性集
    fn mask(&self) -> PropertyMask;

    /// 生成时写入属性覆写
    fn init_particle(&self, init: &mut ParticleInit, rng: &mut dyn RngCore);

    /// 每帧推进一个粒子的属性
    fn update_particle(&self, buffer: &mut ParticleBuffer, index: usize, dt: f32, pct: f32);
}

/// 速度/加速度积分模块
pub struct KinematicsModule {
    pub velocity_min: Vec3,
    pub velocity_max: Vec3,
    pub acceleration: Vec3,
}

impl ParticleModule for KinematicsModule {
    fn name(&self) -> &'static str {
        "kinematics"
    }

    fn mask(&self) -> PropertyMask {
        PropertyMask::VELOCITY | PropertyMask::ACCELERATION
    }

    fn init_particle(&self, init: &mut ParticleInit, rng: &mut dyn RngCore) {
        let mut velocity = Vec3::ZERO;
        for axis in 0..3 {
            velocity[axis] =
                ValueRange::new(self.velocity_min[axis], self.velocity_max[axis]).sample(rng);
        }
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::Velocity,
            velocity,
        ));
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::Acceleration,
            self.acceleration,
        ));
    }

    fn update_particle(&self, buffer: &mut ParticleBuffer, index: usize, dt: f32, _pct: f32) {
        let acceleration = buffer.get::<Vec3>(ParticleProperty::Acceleration, index);
        let velocity = buffer.get::<Vec3>(ParticleProperty::Velocity, index) + acceleration * dt;
        *buffer.get_mut::<Vec3>(ParticleProperty::Velocity, index) = velocity;
        *buffer.get_mut::<Vec3>(ParticleProperty::Position, index) += velocity * dt;
    }
}

/// 颜色渐变模块：出生颜色存入 ColorRange，当前颜色随 pct 向 `end` 插值
pub struct ColorFadeModule {
    pub start: TintRange,
    pub end: Vec4,
}

impl ParticleModule for ColorFadeModule {
    fn name(&self) -> &'static str {
        "color_fade"
    }

    fn mask(&self) -> PropertyMask {
        PropertyMask::COLOR | PropertyMask::COLOR_RANGE
    }

    fn init_particle(&self, init: &mut ParticleInit, rng: &mut dyn RngCore) {
        let spawn_color = self.start.sample(rng);
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::Color,
            spawn_color,
        ));
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::ColorRange,
            spawn_color,
        ));
    }

    fn update_particle(&self, buffer: &mut ParticleBuffer, index: usize, _dt: f32, pct: f32) {
        let spawn_color = buffer.get::<Vec4>(ParticleProperty::ColorRange, index);
        *buffer.get_mut::<Vec4>(ParticleProperty::Color, index) = spawn_color.lerp(self.end, pct);
    }
}

/// 大小曲线模块：出生大小存入 SizeRange，按 pct 缩放到 `end_scale` 倍
pub struct SizeModule {
    pub start: ValueRange,
    pub end_scale: f32,
}

impl ParticleModule for SizeModule {
    fn name(&self) -> &'static str {
        "size"
    }

    fn mask(&self) -> PropertyMask {
        PropertyMask::SIZE | PropertyMask::SIZE_RANGE
    }

    fn init_particle(&self, init: &mut ParticleInit, rng: &mut dyn RngCore) {
        let size = self.start.sample(rng);
        init.overrides
            .push(PropertyOverride::from_pod(ParticleProperty::Size, size));
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::SizeRange,
            size,
        ));
    }

    fn update_particle(&self, buffer: &mut ParticleBuffer, index: usize, _dt: f32, pct: f32) {
        let base = buffer.get::<f32>(ParticleProperty::SizeRange, index);
        let scale = 1.0 + (self.end_scale - 1.0) * pct;
        *buffer.get_mut::<f32>(ParticleProperty::Size, index) = base * scale;
    }
}

/// 自旋模块
pub struct SpinModule {
    pub initial_angle: ValueRange,
    pub speed: ValueRange,
}

impl ParticleModule for SpinModule {
    fn name(&self) -> &'static str {
        "spin"
    }

    fn mask(&self) -> PropertyMask {
        PropertyMask::ANGLE | PropertyMask::ANGLE_SPEED
    }

    fn init_particle(&self, init: &mut ParticleInit, rng: &mut dyn RngCore) {
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::Angle,
            self.initial_angle.sample(rng),
        ));
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::AngleSpeed,
            self.speed.sample(rng),
        ));
    }

    fn update_particle(&self, buffer: &mut ParticleBuffer, index: usize, dt: f32, _pct: f32) {
        let speed = buffer.get::<f32>(ParticleProperty::AngleSpeed, index);
        *buffer.get_mut::<f32>(ParticleProperty::Angle, index) += speed * dt;
    }
}

/// 序列帧动画模块：动画索引随寿命进度线性推进
pub struct SpriteAnimationModule {
    pub frame_count: u32,
}

impl ParticleModule for SpriteAnimationModule {
    fn name(&self) -> &'static str {
        "sprite_animation"
    }

    fn mask(&self) -> PropertyMask {
        PropertyMask::ANIMATION_INDEX
    }

    fn init_particle(&self, init: &mut ParticleInit, _rng: &mut dyn RngCore) {
        init.overrides.push(PropertyOverride::from_pod(
            ParticleProperty::AnimationIndex,
            0.0f32,
        ));
    }

    fn update_particle(&self, buffer: &mut ParticleBuffer, index: usize, _dt: f32, pct: f32) {
        let last = self.frame_count.saturating_sub(1) as f32;
        let frame = (pct * self.frame_count as f32).floor().min(last);
        *buffer.get_mut::<f32>(ParticleProperty::AnimationIndex, index) = frame;
    }
}

// ============================================================================
// 效果定义
// ============================================================================

use crate::particles::emission::EmissionPolicy;

/// 粒子效果定义
///
/// 在制作/加载期构造一次；`mask` 与 `max_particles` 为派生数据，
/// 由会使其失效的 setter（发射策略、寿命、模块列表、上限覆写）重算。
pub struct EffectDefinition {
    id: EffectId,
    name: String,
    emission: EmissionPolicy,
    lifetime: ValueRange,
    /// 逐粒子模拟窗口阈值（<0 表示始终模拟）
    process_time: f32,
    spawn_region: SpawnRegion,
    tint: TintRange,
    material: MaterialId,
    modules: Vec<Box<dyn ParticleModule>>,
    max_particles_override: Option<u32>,

    // 派生数据
    mask: PropertyMask,
    max_particles: u32,
}

impl EffectDefinition {
    pub fn new(name: impl Into<String>, emission: EmissionPolicy) -> Self {
        let mut effect = Self {
            id: EffectId(NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            emission,
            lifetime: ValueRange::fixed(1.0),
            process_time: -1.0,
            spawn_region: SpawnRegion::point(),
            tint: TintRange::fixed(Vec4::ONE),
            material: MaterialId(0),
            modules: Vec::new(),
            max_particles_override: None,
            mask: PropertyMask::empty(),
            max_particles: 0,
        };
        effect.recompute();
        effect
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn emission(&self) -> EmissionPolicy {
        self.emission
    }

    /// 全部模块要求的属性集（含基础属性）
    pub fn mask(&self) -> PropertyMask {
        self.mask
    }

    /// 单个发射器的同时存活粒子数上界
    pub fn max_particles(&self) -> u32 {
        self.max_particles
    }

    /// 粒子的最大寿命（秒）
    pub fn max_lifetime(&self) -> f32 {
        self.lifetime.max
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn modules(&self) -> &[Box<dyn ParticleModule>] {
        &self.modules
    }

    pub fn set_emission(&mut self, emission: EmissionPolicy) {
        self.emission = emission;
        self.recompute();
    }

    pub fn set_lifetime(&mut self, lifetime: ValueRange) {
        self.lifetime = lifetime;
        self.recompute();
    }

    pub fn set_max_particles_override(&mut self, limit: Option<u32>) {
        self.max_particles_override = limit;
        self.recompute();
    }

    pub fn push_module(&mut self, module: Box<dyn ParticleModule>) {
        self.modules.push(module);
        self.recompute();
    }

    pub fn set_process_time(&mut self, process_time: f32) {
        self.process_time = process_time;
    }

    pub fn set_spawn_region(&mut self, region: SpawnRegion) {
        self.spawn_region = region;
    }

    pub fn set_tint(&mut self, tint: TintRange) {
        self.tint = tint;
    }

    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    /// 链式配置（构建期使用）
    pub fn with_lifetime(mut self, min: f32, max: f32) -> Self {
        self.set_lifetime(ValueRange::new(min, max));
        self
    }

    pub fn with_module(mut self, module: Box<dyn ParticleModule>) -> Self {
        self.push_module(module);
        self
    }

    pub fn with_max_particles(mut self, limit: u32) -> Self {
        self.set_max_particles_override(Some(limit));
        self
    }

    /// 重算派生数据（掩码、最大粒子数）
    fn recompute(&mut self) {
        let mut mask = BASE_MASK;
        for module in &self.modules {
            mask |= module.mask();
        }
        self.mask = mask;

        let estimated = self.emission.max_particles(self.lifetime.max);
        self.max_particles = self.max_particles_override.unwrap_or(estimated).max(1);
    }

    /// 按效果配置填充一批初始化记录（制作边界，见模块文档）
    pub fn create_particles(
        &self,
        owner: OwnerId,
        count: u32,
        spawn: &SpawnParams,
        rng: &mut dyn RngCore,
    ) -> ParticleInitList {
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut init = ParticleInit {
                lifetime: self.lifetime.sample(rng),
                position: spawn.origin + self.spawn_region.sample(rng),
                process_time: self.process_time,
                tint: self.tint.sample(rng),
                rotation: spawn.rotation,
                overrides: Vec::new(),
            };
            for module in &self.modules {
                module.init_particle(&mut init, rng);
            }
            items.push(init);
        }
        ParticleInitList {
            owner,
            tint: spawn.tint,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fountain() -> EffectDefinition {
        EffectDefinition::new("fountain", EmissionPolicy::Infinite { rate: 10.0 })
            .with_lifetime(0.5, 1.0)
            .with_module(Box::new(KinematicsModule {
                velocity_min: Vec3::new(-1.0, 2.0, -1.0),
                velocity_max: Vec3::new(1.0, 5.0, 1.0),
                acceleration: Vec3::new(0.0, -9.81, 0.0),
            }))
    }

    #[test]
    fn test_mask_derives_from_modules() {
        let effect = fountain();
        assert!(effect.mask().contains(BASE_MASK));
        assert!(effect.mask().has(ParticleProperty::Velocity));
        assert!(effect.mask().has(ParticleProperty::Acceleration));
        assert!(!effect.mask().has(ParticleProperty::Color));
    }

    #[test]
    fn test_max_particles_recomputed_on_change() {
        let mut effect = fountain();
        // rate 10 × 最大寿命 1.0
        assert_eq!(effect.max_particles(), 10);

        effect.set_lifetime(ValueRange::new(0.5, 2.0));
        assert_eq!(effect.max_particles(), 20);

        effect.set_emission(EmissionPolicy::Burst { count: 64 });
        assert_eq!(effect.max_particles(), 64);

        effect.set_max_particles_override(Some(8));
        assert_eq!(effect.max_particles(), 8);
    }

    #[test]
    fn test_effect_ids_are_unique() {
        let a = fountain();
        let b = fountain();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_create_particles_fills_initializers() {
        let effect = fountain();
        let mut rng = StdRng::seed_from_u64(7);
        let list = effect.create_particles(
            OwnerId(1),
            5,
            &SpawnParams {
                origin: Vec3::new(1.0, 2.0, 3.0),
                ..Default::default()
            },
            &mut rng,
        );

        assert_eq!(list.owner, OwnerId(1));
        assert_eq!(list.items.len(), 5);
        for init in &list.items {
            assert!(init.lifetime >= 0.5 && init.lifetime <= 1.0);
            assert_eq!(init.position, Vec3::new(1.0, 2.0, 3.0));
            // kinematics 模块写入速度和加速度两条覆写
            assert_eq!(init.overrides.len(), 2);
        }
    }

    #[test]
    fn test_value_range_sampling_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = ValueRange::new(2.0, 4.0);
        for _ in 0..100 {
            let v = range.sample(&mut rng);
            assert!(v >= 2.0 && v < 4.0);
        }
        assert_eq!(ValueRange::fixed(7.0).sample(&mut rng), 7.0);
    }
}
