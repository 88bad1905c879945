//! 堆 → GPU 缓冲的适配接口
//!
//! 渲染层每帧逐堆调用：先用尺寸查询扩好 GPU 侧分配，再让堆把存活
//! 区间 `[0, live_count)` 展开成 quad 顶点写进映射好的缓冲，最后取
//! 单次绘制调用的参数。核心从不接触图形 API——这里只写原始字节。

use glam::{Vec3, Vec4};

use crate::core::error::{ParticleError, ParticleResult};
use crate::particles::property::ParticleProperty;
use crate::particles::{MaterialId, ParticleHeap};
use crate::render::vertex::{
    ParticleVertex, VertexLayout, INDICES_PER_PARTICLE, QUAD_CORNERS, VERTS_PER_PARTICLE,
};

/// 一个堆的单次绘制调用参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParams {
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub material: MaterialId,
}

/// GPU 缓冲数据源
///
/// [`ParticleHeap`] 实现此接口；渲染层只依赖 trait，不依赖堆本身。
pub trait HeapBufferSource {
    /// 顶点缓冲所需字节数（按容量计，调用方先扩容再填充）
    fn vertex_buffer_size(&self) -> usize;

    /// 索引缓冲所需字节数（按容量计；容量变更后需重建）
    fn index_buffer_size(&self) -> usize;

    /// 把存活粒子展开为 quad 顶点写入 `out`，返回写入的字节数
    fn fill_vertices(&self, out: &mut [u8], layout: &VertexLayout) -> ParticleResult<usize>;

    /// 写入容量个 quad 的索引（u16），返回写入的字节数
    fn fill_indices(&self, out: &mut [u8]) -> ParticleResult<usize>;

    /// 本堆单次绘制调用的参数
    fn draw_params(&self) -> DrawParams;
}

impl HeapBufferSource for ParticleHeap {
    fn vertex_buffer_size(&self) -> usize {
        self.capacity() * VERTS_PER_PARTICLE * std::mem::size_of::<ParticleVertex>()
    }

    fn index_buffer_size(&self) -> usize {
        self.capacity() * INDICES_PER_PARTICLE * std::mem::size_of::<u16>()
    }

    fn fill_vertices(&self, out: &mut [u8], layout: &VertexLayout) -> ParticleResult<usize> {
        let stride = std::mem::size_of::<ParticleVertex>();
        if layout.stride != stride {
            return Err(ParticleError::LayoutMismatch {
                expected: stride,
                actual: layout.stride,
            });
        }
        let needed = self.live_count() * VERTS_PER_PARTICLE * stride;
        if out.len() < needed {
            return Err(ParticleError::BufferTooSmall {
                needed,
                actual: out.len(),
            });
        }

        let buffer = self.buffer();
        let mut cursor = 0;
        for index in 0..self.live_count() {
            let position = buffer.get::<Vec3>(ParticleProperty::Position, index);
            let size = if buffer.has(ParticleProperty::Size) {
                buffer.get::<f32>(ParticleProperty::Size, index)
            } else {
                1.0
            };
            let color = if buffer.has(ParticleProperty::Color) {
                buffer.get::<Vec4>(ParticleProperty::Color, index)
            } else {
                Vec4::ONE
            };
            let angle = if buffer.has(ParticleProperty::Angle) {
                buffer.get::<f32>(ParticleProperty::Angle, index)
            } else {
                0.0
            };
            let anim_index = if buffer.has(ParticleProperty::AnimationIndex) {
                buffer.get::<f32>(ParticleProperty::AnimationIndex, index)
            } else {
                0.0
            };

            let (sin, cos) = angle.sin_cos();
            for (corner, uv) in QUAD_CORNERS {
                let rotated_x = (corner[0] * cos - corner[1] * sin) * size;
                let rotated_y = (corner[0] * sin + corner[1] * cos) * size;
                let vertex = ParticleVertex {
                    position: [
                        position.x + rotated_x,
                        position.y + rotated_y,
                        position.z,
                    ],
                    uv,
                    color: color.to_array(),
                    size,
                    angle,
                    anim_index,
                };
                out[cursor..cursor + stride].copy_from_slice(bytemuck::bytes_of(&vertex));
                cursor += stride;
            }
        }
        Ok(cursor)
    }

    fn fill_indices(&self, out: &mut [u8]) -> ParticleResult<usize> {
        let needed = self.index_buffer_size();
        if out.len() < needed {
            return Err(ParticleError::BufferTooSmall {
                needed,
                actual: out.len(),
            });
        }

        // 容量受硬上限约束，4 × capacity 不会溢出 u16
        const PATTERN: [u16; INDICES_PER_PARTICLE] = [0, 1, 2, 2, 3, 0];
        let mut cursor = 0;
        for quad in 0..self.capacity() {
            let base = (quad * VERTS_PER_PARTICLE) as u16;
            for offset in PATTERN {
                let index = base + offset;
                out[cursor..cursor + 2].copy_from_slice(&index.to_ne_bytes());
                cursor += 2;
            }
        }
        Ok(cursor)
    }

    fn draw_params(&self) -> DrawParams {
        DrawParams {
            index_count: (self.live_count() * INDICES_PER_PARTICLE) as u32,
            first_index: 0,
            base_vertex: 0,
            material: self.material(),
        }
    }
}
