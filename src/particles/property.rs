//! 粒子属性定义
//!
//! 每个粒子实例由一组可枚举的属性构成；一个效果的模块集合决定它
//! 需要哪些属性（属性掩码），粒子缓冲区按掩码逐属性分配存储。

use bitflags::bitflags;

/// 粒子属性枚举
///
/// 属性全集是固定的；每个属性有固定的元素类型（见 [`PropertyKind`]）。
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleProperty {
    /// 粒子创建者标识（用于按 owner 批量移除）
    Owner = 0,
    /// 已存活时间（秒）
    Time,
    /// 总寿命（秒）
    Lifetime,
    /// 模拟窗口阈值（<0 表示始终模拟，否则为归一化截止点）
    ProcessTime,
    /// 位置
    Position,
    /// 当前大小
    Size,
    /// 出生大小（大小曲线的基准值）
    SizeRange,
    /// 当前颜色
    Color,
    /// 出生颜色（颜色渐变的基准值）
    ColorRange,
    /// 速度
    Velocity,
    /// 加速度
    Acceleration,
    /// 旋转角（弧度）
    Angle,
    /// 角速度（弧度/秒）
    AngleSpeed,
    /// 序列帧动画索引
    AnimationIndex,
}

/// 属性总数
pub const PROPERTY_COUNT: usize = 14;

/// 属性元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    F32,
    U64,
    Vec3,
    Vec4,
}

impl PropertyKind {
    /// 单个元素的字节大小
    pub fn byte_size(self) -> usize {
        match self {
            PropertyKind::F32 => 4,
            PropertyKind::U64 => 8,
            PropertyKind::Vec3 => 12,
            PropertyKind::Vec4 => 16,
        }
    }
}

impl ParticleProperty {
    /// 全部属性，按位序排列
    pub const ALL: [ParticleProperty; PROPERTY_COUNT] = [
        ParticleProperty::Owner,
        ParticleProperty::Time,
        ParticleProperty::Lifetime,
        ParticleProperty::ProcessTime,
        ParticleProperty::Position,
        ParticleProperty::Size,
        ParticleProperty::SizeRange,
        ParticleProperty::Color,
        ParticleProperty::ColorRange,
        ParticleProperty::Velocity,
        ParticleProperty::Acceleration,
        ParticleProperty::Angle,
        ParticleProperty::AngleSpeed,
        ParticleProperty::AnimationIndex,
    ];

    /// 属性在缓冲区数组表中的下标
    pub fn index(self) -> usize {
        self as usize
    }

    /// 属性对应的掩码位
    pub fn bit(self) -> PropertyMask {
        PropertyMask::from_bits_truncate(1 << self as u32)
    }

    /// 属性的元素类型
    pub fn kind(self) -> PropertyKind {
        match self {
            ParticleProperty::Owner => PropertyKind::U64,
            ParticleProperty::Position
            | ParticleProperty::Velocity
            | ParticleProperty::Acceleration => PropertyKind::Vec3,
            ParticleProperty::Color | ParticleProperty::ColorRange => PropertyKind::Vec4,
            _ => PropertyKind::F32,
        }
    }

    /// 属性名（用于日志和错误信息）
    pub fn name(self) -> &'static str {
        match self {
            ParticleProperty::Owner => "Owner",
            ParticleProperty::Time => "Time",
            ParticleProperty::Lifetime => "Lifetime",
            ParticleProperty::ProcessTime => "ProcessTime",
            ParticleProperty::Position => "Position",
            ParticleProperty::Size => "Size",
            ParticleProperty::SizeRange => "SizeRange",
            ParticleProperty::Color => "Color",
            ParticleProperty::ColorRange => "ColorRange",
            ParticleProperty::Velocity => "Velocity",
            ParticleProperty::Acceleration => "Acceleration",
            ParticleProperty::Angle => "Angle",
            ParticleProperty::AngleSpeed => "AngleSpeed",
            ParticleProperty::AnimationIndex => "AnimationIndex",
        }
    }
}

bitflags! {
    /// 属性掩码
    ///
    /// 固定全集上的位集，纯值类型：只有置位、测试、并集语义。
    /// 一旦赋给某个缓冲区的布局就不可再变。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyMask: u32 {
        const OWNER = 1 << 0;
        const TIME = 1 << 1;
        const LIFETIME = 1 << 2;
        const PROCESS_TIME = 1 << 3;
        const POSITION = 1 << 4;
        const SIZE = 1 << 5;
        const SIZE_RANGE = 1 << 6;
        const COLOR = 1 << 7;
        const COLOR_RANGE = 1 << 8;
        const VELOCITY = 1 << 9;
        const ACCELERATION = 1 << 10;
        const ANGLE = 1 << 11;
        const ANGLE_SPEED = 1 << 12;
        const ANIMATION_INDEX = 1 << 13;
    }
}

/// 每个效果无条件携带的基础属性集
pub const BASE_MASK: PropertyMask = PropertyMask::from_bits_truncate(
    PropertyMask::OWNER.bits()
        | PropertyMask::TIME.bits()
        | PropertyMask::LIFETIME.bits()
        | PropertyMask::PROCESS_TIME.bits()
        | PropertyMask::POSITION.bits(),
);

impl PropertyMask {
    /// 掩码中是否包含指定属性
    pub fn has(self, property: ParticleProperty) -> bool {
        self.contains(property.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_bits_are_distinct() {
        let mut seen = PropertyMask::empty();
        for property in ParticleProperty::ALL {
            assert!(!seen.has(property));
            seen |= property.bit();
        }
        assert_eq!(seen, PropertyMask::all());
    }

    #[test]
    fn test_base_mask_contents() {
        assert!(BASE_MASK.has(ParticleProperty::Owner));
        assert!(BASE_MASK.has(ParticleProperty::Time));
        assert!(BASE_MASK.has(ParticleProperty::Lifetime));
        assert!(BASE_MASK.has(ParticleProperty::ProcessTime));
        assert!(BASE_MASK.has(ParticleProperty::Position));
        assert!(!BASE_MASK.has(ParticleProperty::Color));
    }

    #[test]
    fn test_mask_union() {
        let mask = BASE_MASK | ParticleProperty::Velocity.bit();
        assert!(mask.has(ParticleProperty::Velocity));
        assert!(mask.has(ParticleProperty::Position));
        assert!(!mask.has(ParticleProperty::Acceleration));
    }

    #[test]
    fn test_property_kinds() {
        assert_eq!(ParticleProperty::Owner.kind(), PropertyKind::U64);
        assert_eq!(ParticleProperty::Position.kind(), PropertyKind::Vec3);
        assert_eq!(ParticleProperty::Color.kind(), PropertyKind::Vec4);
        assert_eq!(ParticleProperty::Lifetime.kind(), PropertyKind::F32);
        assert_eq!(PropertyKind::Vec3.byte_size(), 12);
    }
}
