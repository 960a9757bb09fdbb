// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// 按键分桶的集合
///
/// 元素通过键函数分到不同的桶中（URL 按主机分桶），
/// 这样调度时可以一次性跳过所有正在请求中的主机，而不必逐个检查元素。
/// 空桶会在删除最后一个元素时一并移除。
#[derive(Clone)]
pub struct BucketSet<T, K> {
    key: fn(&T) -> K,
    buckets: HashMap<K, HashSet<T>>,
}

impl<T, K> BucketSet<T, K>
where
    T: Eq + Hash,
    K: Eq + Hash,
{
    /// 使用键函数创建空集合
    pub fn new(key: fn(&T) -> K) -> Self {
        Self {
            key,
            buckets: HashMap::new(),
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.buckets
            .get(&(self.key)(item))
            .is_some_and(|bucket| bucket.contains(item))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buckets.values().flat_map(|bucket| bucket.iter())
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// 所有非空桶的键
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.buckets.keys()
    }

    /// 插入元素，元素已存在时返回 false
    pub fn insert(&mut self, item: T) -> bool {
        let key = (self.key)(&item);
        self.buckets.entry(key).or_default().insert(item)
    }

    /// 删除元素，元素不存在时返回 false
    pub fn remove(&mut self, item: &T) -> bool {
        let key = (self.key)(item);
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return false;
        };

        let removed = bucket.remove(item);
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        removed
    }

    /// 返回所有键不在 `keys` 中的元素
    pub fn key_difference(&self, keys: &HashSet<K>) -> Vec<&T> {
        self.buckets
            .iter()
            .filter(|(key, _)| !keys.contains(*key))
            .flat_map(|(_, bucket)| bucket.iter())
            .collect()
    }

    /// 每个不在 `keys` 中的桶里取一个元素
    pub fn one_per_bucket_except(&self, keys: &HashSet<K>) -> Vec<(&K, &T)> {
        self.buckets
            .iter()
            .filter(|(key, _)| !keys.contains(*key))
            .filter_map(|(key, bucket)| bucket.iter().next().map(|item| (key, item)))
            .collect()
    }
}

impl<T, K> Extend<T> for BucketSet<T, K>
where
    T: Eq + Hash,
    K: Eq + Hash,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}
