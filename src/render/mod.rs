//! 渲染边界模块
//!
//! 粒子核心与 GPU/图形 API 抽象之间的接口：
//! - `vertex` - quad 顶点格式与布局描述符
//! - `source` - 堆实现的缓冲填充/绘制参数接口
//!
//! 核心从不发起 GPU 调用；渲染层按 [`source::HeapBufferSource`]
//! 逐堆拉取缓冲内容并提交一次绘制。

pub mod source;
pub mod vertex;

pub use source::{DrawParams, HeapBufferSource};
pub use vertex::{ParticleVertex, VertexLayout, INDICES_PER_PARTICLE, VERTS_PER_PARTICLE};
