//! 粒子模拟核心
//!
//! 掩码驱动的粒子存储与逐效果粒子池。
//!
//! ## 架构设计
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Particle Core                           │
//! ├────────────────────────────────────────────────────────────┤
//! │  EffectDefinition（制作期）                                 │
//! │     - 发射策略 / 数值生成器 / 模块列表                       │
//! │     - 派生属性掩码与最大粒子数                               │
//! │                                                            │
//! │  ParticleHeapCollection（每渲染通道）                       │
//! │     - (效果, 掩码) → ParticleHeap 共享缓存                  │
//! │     - 零链接 + 宽限期 → 回收                                │
//! │                                                            │
//! │  ParticleHeap（运行时池）                                   │
//! │     - SoA ParticleBuffer，容量 2 倍摊销增长                 │
//! │     - 逐帧老化、O(1) 交换移除、owner 引用计数               │
//! │     - 存活区间 [0, live_count) 作为 GPU 上传源              │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! 单线程协作模型：所有堆的 `process` 在渲染层读取缓冲之前完成，
//! 堆之间没有顺序依赖。

pub mod buffer;
pub mod effect;
pub mod emission;
pub mod heap;
pub mod pool;
pub mod property;

pub use buffer::{ParticleBuffer, PropertyValue};
pub use effect::{
    ColorFadeModule, EffectDefinition, EffectId, KinematicsModule, ParticleInit,
    ParticleInitList, ParticleModule, PropertyOverride, SizeModule, SpawnParams, SpawnRegion,
    SpinModule, SpriteAnimationModule, TintRange, ValueRange,
};
pub use emission::{EmissionPolicy, BURST_FIRED};
pub use heap::{ParticleHeap, HEAP_CAPACITY_LIMIT};
pub use pool::ParticleHeapCollection;
pub use property::{ParticleProperty, PropertyKind, PropertyMask, BASE_MASK, PROPERTY_COUNT};

/// 发射器标识
///
/// 不透明句柄：堆只比较、哈希，从不解引用。场景层保证进程内唯一，
/// 任何稳定唯一句柄皆可。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterId(pub u64);

/// 粒子创建者标识（owner）
///
/// 与 [`EmitterId`] 同样是不透明句柄，用于按创建者批量移除粒子
/// 和"发射器可否安全拆除"的 O(1) 查询。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(pub u64);

/// 材质句柄（着色器 + 纹理的组合，由渲染层解释）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialId(pub u64);

/// 渲染通道标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassId(pub u32);
