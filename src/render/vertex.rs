//! 粒子顶点格式
//!
//! 存活粒子展开为四边形（quad）顶点的 GPU 可上传格式。
//! 布局与着色器侧的顶点输入一一对应。

use bytemuck::{Pod, Zeroable};

/// 粒子四边形顶点
///
/// 每个存活粒子展开为 4 个顶点；旋转和缩放在 CPU 侧烘焙进位置，
/// 角度与动画帧索引仍随顶点传给着色器做 billboard/图集采样。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    /// 位置
    pub position: [f32; 3],
    /// 纹理坐标
    pub uv: [f32; 2],
    /// 颜色 (RGBA)
    pub color: [f32; 4],
    /// 大小
    pub size: f32,
    /// 旋转角（弧度）
    pub angle: f32,
    /// 序列帧动画索引
    pub anim_index: f32,
}

/// 每个粒子的顶点数
pub const VERTS_PER_PARTICLE: usize = 4;

/// 每个粒子的索引数（两个三角形）
pub const INDICES_PER_PARTICLE: usize = 6;

/// 四边形角点（单位大小，中心为原点）及对应 UV
pub const QUAD_CORNERS: [([f32; 2], [f32; 2]); VERTS_PER_PARTICLE] = [
    ([-0.5, -0.5], [0.0, 1.0]),
    ([0.5, -0.5], [1.0, 1.0]),
    ([0.5, 0.5], [1.0, 0.0]),
    ([-0.5, 0.5], [0.0, 0.0]),
];

/// 顶点布局描述符
///
/// 渲染层据此建立顶点输入状态；填充方检查 stride 与实际顶点结构
/// 一致后才写入。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: usize,
    pub position_offset: usize,
    pub uv_offset: usize,
    pub color_offset: usize,
    pub size_offset: usize,
    pub angle_offset: usize,
    pub anim_index_offset: usize,
}

impl VertexLayout {
    /// [`ParticleVertex`] 的标准布局
    pub fn particle_quad() -> Self {
        Self {
            stride: std::mem::size_of::<ParticleVertex>(),
            position_offset: 0,
            uv_offset: 12,
            color_offset: 20,
            size_offset: 36,
            angle_offset: 40,
            anim_index_offset: 44,
        }
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::particle_quad()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        // 12 个 f32，无填充
        assert_eq!(std::mem::size_of::<ParticleVertex>(), 48);
    }

    #[test]
    fn test_standard_layout_matches_struct() {
        let layout = VertexLayout::particle_quad();
        assert_eq!(layout.stride, 48);
        assert_eq!(layout.uv_offset, 12);
        assert_eq!(layout.color_offset, 20);
        assert_eq!(layout.size_offset, 36);
        assert_eq!(layout.anim_index_offset, 44);
    }
}
