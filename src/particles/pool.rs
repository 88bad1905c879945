//! 粒子堆缓存
//!
//! 按渲染通道缓存 [`ParticleHeap`]，键为（效果标识，属性掩码位）。
//! N 个引用同一效果的发射器因此共享一个堆、一个 GPU 缓冲和一次
//! 绘制调用。掩码或通道不同的效果永远不共享——缓冲布局是掩码特定的。
//!
//! 回收只发生在 [`ParticleHeapCollection::clear_unused_heaps`]：
//! 零链接且宽限期已过的堆在这里销毁，别处绝不销毁。

use std::collections::HashMap;

use crate::particles::effect::{EffectDefinition, EffectId};
use crate::particles::heap::ParticleHeap;
use crate::particles::RenderPassId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct HeapKey {
    effect: EffectId,
    mask_bits: u32,
}

impl HeapKey {
    fn of(effect: &EffectDefinition) -> Self {
        Self {
            effect: effect.id(),
            mask_bits: effect.mask().bits(),
        }
    }
}

/// 粒子堆集合
///
/// 单线程使用：链接、解除链接和回收都只在主线程的帧循环里发生。
pub struct ParticleHeapCollection {
    passes: HashMap<RenderPassId, HashMap<HeapKey, ParticleHeap>>,
    tick: u64,
}

impl ParticleHeapCollection {
    pub fn new() -> Self {
        Self {
            passes: HashMap::new(),
            tick: 0,
        }
    }

    /// 当前帧号（宽限期的时间基准）
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// 推进帧号（每帧开始调用一次）
    pub fn advance_frame(&mut self) {
        self.tick += 1;
    }

    /// 获取（缺失则创建）效果在指定通道的共享堆
    ///
    /// 保证（效果，掩码，通道）三元组至多对应一个堆。
    pub fn heap_mut(
        &mut self,
        effect: &EffectDefinition,
        pass: RenderPassId,
    ) -> &mut ParticleHeap {
        self.passes
            .entry(pass)
            .or_default()
            .entry(HeapKey::of(effect))
            .or_insert_with(|| {
                log::debug!(
                    "creating particle heap for effect '{}' in pass {:?}",
                    effect.name(),
                    pass
                );
                ParticleHeap::new(effect)
            })
    }

    /// 只读查找（不创建）
    pub fn heap(&self, effect: &EffectDefinition, pass: RenderPassId) -> Option<&ParticleHeap> {
        self.passes.get(&pass)?.get(&HeapKey::of(effect))
    }

    /// 当前缓存的堆总数
    pub fn heap_count(&self) -> usize {
        self.passes.values().map(HashMap::len).sum()
    }

    /// 遍历指定通道的所有堆（渲染层逐堆拉取缓冲用）
    pub fn heaps_in_pass(
        &self,
        pass: RenderPassId,
    ) -> impl Iterator<Item = &ParticleHeap> {
        self.passes.get(&pass).into_iter().flat_map(HashMap::values)
    }

    /// 回收零链接且宽限期已过的堆（每帧或更低频调用）
    pub fn clear_unused_heaps(&mut self) {
        let now = self.tick;
        let mut evicted = 0usize;
        for heaps in self.passes.values_mut() {
            heaps.retain(|_, heap| {
                if heap.is_expired(now) {
                    evicted += 1;
                    false
                } else {
                    true
                }
            });
        }
        self.passes.retain(|_, heaps| !heaps.is_empty());
        if evicted > 0 {
            log::debug!("evicted {} expired particle heaps at tick {}", evicted, now);
        }
    }

    /// 清空全部堆（场景卸载）
    pub fn clear(&mut self) {
        self.passes.clear();
    }
}

impl Default for ParticleHeapCollection {
    fn default() -> Self {
        Self::new()
    }
}
