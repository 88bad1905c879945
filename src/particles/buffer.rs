//! 粒子缓冲区（SoA 存储）
//!
//! 按属性掩码逐属性分配的 Structure-of-Arrays 存储：掩码中每个置位
//! 属性对应一条长度恰好为 `capacity` 的连续类型化数组，未置位属性
//! 没有后备存储。布局在构造时确定，此后只能整体重分配容量。
//!
//! 访问掩码之外的属性是编程错误（panic）——正确代码中布局随堆建立
//! 一次，之后从不试探性查询。

use glam::{Vec3, Vec4};

use crate::core::error::{ParticleError, ParticleResult};
use crate::particles::property::{ParticleProperty, PropertyKind, PropertyMask, PROPERTY_COUNT};

/// 单个属性的类型化数组
#[derive(Debug, Clone)]
enum PropertyArray {
    F32(Vec<f32>),
    U64(Vec<u64>),
    Vec3(Vec<Vec3>),
    Vec4(Vec<Vec4>),
}

impl PropertyArray {
    fn zeroed(kind: PropertyKind, capacity: usize) -> Self {
        match kind {
            PropertyKind::F32 => PropertyArray::F32(vec![0.0; capacity]),
            PropertyKind::U64 => PropertyArray::U64(vec![0; capacity]),
            PropertyKind::Vec3 => PropertyArray::Vec3(vec![Vec3::ZERO; capacity]),
            PropertyKind::Vec4 => PropertyArray::Vec4(vec![Vec4::ZERO; capacity]),
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        match self {
            PropertyArray::F32(v) => v.swap(a, b),
            PropertyArray::U64(v) => v.swap(a, b),
            PropertyArray::Vec3(v) => v.swap(a, b),
            PropertyArray::Vec4(v) => v.swap(a, b),
        }
    }

    /// 保留前 `min(old, new)` 个元素，新增部分清零
    fn resize_copy(&mut self, new_capacity: usize) {
        match self {
            PropertyArray::F32(v) => v.resize(new_capacity, 0.0),
            PropertyArray::U64(v) => v.resize(new_capacity, 0),
            PropertyArray::Vec3(v) => v.resize(new_capacity, Vec3::ZERO),
            PropertyArray::Vec4(v) => v.resize(new_capacity, Vec4::ZERO),
        }
    }

    fn byte_size(&self) -> usize {
        match self {
            PropertyArray::F32(v) => v.len() * 4,
            PropertyArray::U64(v) => v.len() * 8,
            PropertyArray::Vec3(v) => v.len() * 12,
            PropertyArray::Vec4(v) => v.len() * 16,
        }
    }

    fn write_raw(&mut self, index: usize, bytes: &[u8]) -> Result<(), usize> {
        match self {
            PropertyArray::F32(v) => write_pod(&mut v[index], bytes),
            PropertyArray::U64(v) => write_pod(&mut v[index], bytes),
            PropertyArray::Vec3(v) => write_pod(&mut v[index], bytes),
            PropertyArray::Vec4(v) => write_pod(&mut v[index], bytes),
        }
    }
}

fn write_pod<T: bytemuck::Pod>(slot: &mut T, bytes: &[u8]) -> Result<(), usize> {
    if bytes.len() != std::mem::size_of::<T>() {
        return Err(std::mem::size_of::<T>());
    }
    *slot = bytemuck::pod_read_unaligned(bytes);
    Ok(())
}

mod sealed {
    use super::PropertyArray;

    pub trait Sealed: Sized {
        fn slice(array: &PropertyArray) -> Option<&[Self]>;
        fn slice_mut(array: &mut PropertyArray) -> Option<&mut [Self]>;
    }

    macro_rules! impl_sealed {
        ($ty:ty, $variant:ident) => {
            impl Sealed for $ty {
                fn slice(array: &PropertyArray) -> Option<&[Self]> {
                    match array {
                        PropertyArray::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn slice_mut(array: &mut PropertyArray) -> Option<&mut [Self]> {
                    match array {
                        PropertyArray::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        };
    }

    impl_sealed!(f32, F32);
    impl_sealed!(u64, U64);
    impl_sealed!(glam::Vec3, Vec3);
    impl_sealed!(glam::Vec4, Vec4);
}

/// 可作为粒子属性元素的类型
///
/// 封闭 trait：只为 `f32` / `u64` / `Vec3` / `Vec4` 实现，
/// 对应 [`PropertyKind`] 的四种元素类型。
pub trait PropertyValue: bytemuck::Pod + sealed::Sealed {}

impl<T: bytemuck::Pod + sealed::Sealed> PropertyValue for T {}

/// 粒子缓冲区
///
/// 每个 [`crate::particles::ParticleHeap`] 拥有恰好一个缓冲区。
pub struct ParticleBuffer {
    mask: PropertyMask,
    capacity: usize,
    arrays: [Option<PropertyArray>; PROPERTY_COUNT],
}

impl ParticleBuffer {
    /// 按掩码和容量创建缓冲区，所有数组零初始化
    pub fn new(mask: PropertyMask, capacity: usize) -> Self {
        let arrays = std::array::from_fn(|i| {
            let property = ParticleProperty::ALL[i];
            mask.has(property)
                .then(|| PropertyArray::zeroed(property.kind(), capacity))
        });
        Self {
            mask,
            capacity,
            arrays,
        }
    }

    /// 缓冲区的属性掩码
    pub fn mask(&self) -> PropertyMask {
        self.mask
    }

    /// 元素槽位数
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 掩码中是否包含指定属性
    pub fn has(&self, property: ParticleProperty) -> bool {
        self.mask.has(property)
    }

    /// 所有属性数组的总字节数
    pub fn byte_size(&self) -> usize {
        self.arrays
            .iter()
            .flatten()
            .map(PropertyArray::byte_size)
            .sum()
    }

    fn array(&self, property: ParticleProperty) -> &PropertyArray {
        self.arrays[property.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("property {} is not in the buffer mask", property.name()))
    }

    fn array_mut(&mut self, property: ParticleProperty) -> &mut PropertyArray {
        self.arrays[property.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("property {} is not in the buffer mask", property.name()))
    }

    /// 读取一个元素
    ///
    /// # Panics
    ///
    /// 属性不在掩码中或元素类型不匹配时 panic（编程错误）。
    pub fn get<T: PropertyValue>(&self, property: ParticleProperty, index: usize) -> T {
        let slice = T::slice(self.array(property))
            .unwrap_or_else(|| panic!("property {} element type mismatch", property.name()));
        slice[index]
    }

    /// 可变访问一个元素
    ///
    /// # Panics
    ///
    /// 属性不在掩码中或元素类型不匹配时 panic（编程错误）。
    pub fn get_mut<T: PropertyValue>(
        &mut self,
        property: ParticleProperty,
        index: usize,
    ) -> &mut T {
        let slice = T::slice_mut(self.array_mut(property))
            .unwrap_or_else(|| panic!("property {} element type mismatch", property.name()));
        &mut slice[index]
    }

    /// 只读访问整条属性数组（渲染填充用）
    pub fn slice<T: PropertyValue>(&self, property: ParticleProperty) -> &[T] {
        T::slice(self.array(property))
            .unwrap_or_else(|| panic!("property {} element type mismatch", property.name()))
    }

    /// 交换两个槽位的全部属性值（O(1) 移除的基础操作）
    pub fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for array in self.arrays.iter_mut().flatten() {
            array.swap(a, b);
        }
    }

    /// 从不透明字节块覆写一个元素
    ///
    /// 通用模块在不知道缓冲区布局的情况下填充属性时使用。
    /// 字节长度与元素大小不符时返回错误。
    pub fn write_raw(
        &mut self,
        property: ParticleProperty,
        index: usize,
        bytes: &[u8],
    ) -> ParticleResult<()> {
        self.array_mut(property)
            .write_raw(index, bytes)
            .map_err(|expected| ParticleError::BlobSizeMismatch {
                property: property.name(),
                expected,
                actual: bytes.len(),
            })
    }

    /// 重分配到新容量，丢弃全部内容（零初始化）
    pub fn resize(&mut self, new_capacity: usize) {
        for (i, slot) in self.arrays.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(PropertyArray::zeroed(
                    ParticleProperty::ALL[i].kind(),
                    new_capacity,
                ));
            }
        }
        self.capacity = new_capacity;
    }

    /// 重分配到新容量，保留前 `min(old, new)` 个元素
    pub fn resize_copy(&mut self, new_capacity: usize) {
        for array in self.arrays.iter_mut().flatten() {
            array.resize_copy(new_capacity);
        }
        self.capacity = new_capacity;
    }
}
