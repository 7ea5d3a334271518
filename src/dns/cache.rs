use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::types::{AnyRecordType, Answer, DnsResponse, Question, DEFAULT_TTL};

pub const DEFAULT_CACHE_SIZE: usize = 1000;

struct CacheEntry {
    value: Answer,
    expires_at: Instant,
}

#[derive(Default)]
struct Slot {
    entries: Vec<CacheEntry>,
    /// 最近一次写入或命中时的代号，与 `order` 中的记录对应
    generation: u64,
}

#[derive(Default)]
struct Slots {
    entries: HashMap<String, Slot>,
    /// 按代号排列的 LRU 队列，队首最旧；代号与槽位不一致的记录已失效，淘汰时跳过
    order: VecDeque<(String, u64)>,
    next_generation: u64,
}

impl Slots {
    fn touch(&mut self, key: &str) {
        let Some(slot) = self.entries.get_mut(key) else {
            return;
        };
        self.next_generation += 1;
        slot.generation = self.next_generation;
        self.order.push_back((key.to_string(), self.next_generation));
        self.compact();
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|slot| slot.generation == generation)
    }

    /// 失效记录过多时重建队列，保证队列长度与槽位数同阶
    fn compact(&mut self) {
        if self.order.len() <= 2 * self.entries.len() + 16 {
            return;
        }
        let order = std::mem::take(&mut self.order);
        self.order = order
            .into_iter()
            .filter(|(key, generation)| self.is_current(key, *generation))
            .collect();
    }

    fn evict_if_needed(&mut self, max_entries: usize) {
        while self.entries.len() > max_entries {
            let Some((oldest, generation)) = self.order.pop_front() else {
                break;
            };
            if !self.is_current(&oldest, generation) {
                continue;
            }
            self.entries.remove(&oldest);
            debug!(key = oldest.as_str(), "DNS cache slot evicted");
        }
    }

    /// 取出某个槽位中未过期的应答，并清理已过期的条目
    fn live_answers(&mut self, key: &str, requested: AnyRecordType, now: Instant) -> Vec<Answer> {
        let Some(slot) = self.entries.get_mut(key) else {
            return Vec::new();
        };

        slot.entries.retain(|entry| entry.expires_at > now);
        if slot.entries.is_empty() {
            self.remove(key);
            return Vec::new();
        }

        let use_value = requested.is_value();
        let answers = slot
            .entries
            .iter()
            .map(|entry| Answer {
                ttl: Some(remaining_secs(entry.expires_at, now)),
                record_type: entry.value.record_type.convert(use_value),
                ..entry.value.clone()
            })
            .collect();
        self.touch(key);
        answers
    }
}

fn remaining_secs(expires_at: Instant, now: Instant) -> u32 {
    let millis = expires_at.saturating_duration_since(now).as_millis();
    ((millis + 500) / 1000) as u32
}

/// 缓存键始终使用数值形式的类型，使 A 与 "A" 命中同一槽位
fn cache_key(domain: &str, record_type: AnyRecordType) -> String {
    format!("{}-{}", domain.to_lowercase(), record_type.to_value().code())
}

/// 感知 TTL 的应答缓存
///
/// 以 (域名, 类型) 为槽位，每个槽位可累积多条应答。槽位数量受
/// `max_entries` 限制，超出时淘汰最久未被写入或命中的槽位，与其是否过期无关。
pub struct AnswerCache {
    slots: Mutex<Slots>,
    max_entries: usize,
}

impl AnswerCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("DNS cache lock poisoned, discarding cached answers");
                let mut guard = poisoned.into_inner();
                *guard = Slots::default();
                self.slots.clear_poison();
                guard
            }
        }
    }

    /// 仅当所有请求类型都有未过期应答时返回结果，不返回部分命中
    pub fn get(&self, domain: &str, types: &[AnyRecordType]) -> Option<DnsResponse> {
        let now = Instant::now();
        let mut slots = self.lock();
        let mut answers = Vec::new();

        for &record_type in types {
            let key = cache_key(domain, record_type);
            let cached = slots.live_answers(&key, record_type, now);

            if cached.is_empty() {
                debug!(domain = domain, record_type = %record_type, "DNS cache miss");
                return None;
            }

            answers.extend(cached);
        }

        debug!(domain = domain, count = answers.len(), "DNS cache hit");
        let questions = types.iter().map(|t| Question::new(domain, *t)).collect();
        Some(DnsResponse::new(questions, answers))
    }

    pub fn add(&self, domain: &str, answer: Answer) {
        let key = cache_key(domain, answer.record_type);
        let ttl = answer.ttl.unwrap_or(DEFAULT_TTL);
        let expires_at = Instant::now() + Duration::from_secs(u64::from(ttl));

        let mut slots = self.lock();
        slots.entries.entry(key.clone()).or_default().entries.push(CacheEntry {
            value: answer,
            expires_at,
        });
        slots.touch(&key);
        slots.evict_if_needed(self.max_entries);
    }

    /// 删除 (域名, 类型) 对应的槽位
    ///
    /// 与 `get`/`add` 一样使用数值形式的键，`RecordType::A` 与
    /// `RecordTypeLabel::A` 删除的是同一个槽位。
    pub fn remove(&self, domain: &str, record_type: impl Into<AnyRecordType>) {
        let key = cache_key(domain, record_type.into());
        self.lock().remove(&key);
    }

    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.entries.clear();
        slots.order.clear();
    }

    /// 当前槽位数量（含尚未被清理的过期槽位）
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}
