//! # Particle Engine
//!
//! 实时 2D/3D 渲染引擎的粒子模拟与缓冲池化核心。
//!
//! ## Features
//!
//! - **Mask-Driven Storage**: 按属性掩码逐属性分配的 SoA 粒子缓冲区
//! - **Shared Heaps**: 同一效果的 N 个发射器共享一个堆、一次绘制调用
//! - **Amortized Growth**: 2 倍摊销扩容 + 硬上限，帧中无分配尖峰
//! - **Rate Scheduling**: 基于小数累加器的帧率无关发射调度
//! - **Grace-Period Eviction**: 零链接堆过宽限期后才回收
//! - **Fail-Soft**: 粒子效果的任何失败都不会拖垮一帧
//!
//! ## 使用示例
//!
//! ```ignore
//! use particle_engine::particles::*;
//!
//! let effect = EffectDefinition::new("sparks", EmissionPolicy::Infinite { rate: 100.0 })
//!     .with_lifetime(0.5, 1.5)
//!     .with_module(Box::new(KinematicsModule {
//!         velocity_min: Vec3::new(-1.0, 2.0, -1.0),
//!         velocity_max: Vec3::new(1.0, 5.0, 1.0),
//!         acceleration: Vec3::new(0.0, -9.81, 0.0),
//!     }));
//!
//! let mut pool = ParticleHeapCollection::new();
//! let heap = pool.heap_mut(&effect, RenderPassId(0));
//! heap.link(EmitterId(1), &effect);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: 错误类型与帧级诊断统计
//! - [`particles`]: 属性掩码、缓冲区、发射策略、效果定义、堆与堆缓存
//! - [`render`]: 顶点展开与 GPU 缓冲适配接口

/// 错误类型与帧级诊断统计
pub mod core;
/// 粒子模拟核心
pub mod particles;
/// 渲染边界（顶点展开、缓冲填充接口）
pub mod render;

pub use crate::core::{FrameStats, ParticleError, ParticleResult};
pub use particles::{
    EffectDefinition, EmissionPolicy, EmitterId, MaterialId, OwnerId, ParticleBuffer,
    ParticleHeap, ParticleHeapCollection, ParticleProperty, PropertyMask, RenderPassId,
};
pub use render::{DrawParams, HeapBufferSource, ParticleVertex, VertexLayout};
