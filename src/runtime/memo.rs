use crate::runtime::value::Value;
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

pub const CACHE_LIMIT: usize = 200;
pub const MISS_LIMIT: usize = 1_000_000;

/// Call-site memoization state shared by every closure produced from one
/// `Function` expression. Starts enabled only for let-bound functions whose
/// body passed the build-time purity check; once disabled it stays disabled
/// and the cache is released.
pub struct Memo {
    enabled: bool,
    cache: FxHashMap<String, Value>,
    size: usize,
    misses: usize,
}

impl Memo {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            cache: FxHashMap::default(),
            size: 0,
            misses: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.cache = FxHashMap::default();
        self.size = 0;
    }

    /// Argument fingerprint: decimal rendering of each numeric argument
    /// followed by a comma. Any non-numeric argument means the call cannot
    /// be keyed and the cell must be disabled.
    pub fn fingerprint(args: &[Value]) -> Option<String> {
        let mut key = String::new();
        for arg in args {
            match arg {
                Value::Int(v) => {
                    let _ = write!(key, "{v},");
                }
                Value::Big(v) => {
                    let _ = write!(key, "{v},");
                }
                _ => return None,
            }
        }
        Some(key)
    }

    pub fn lookup(&mut self, key: &str) -> Option<Value> {
        let hit = self.cache.get(key).cloned();
        if hit.is_some() {
            self.misses = 0;
        }
        hit
    }

    /// A lookup came up empty. Misses only age the cell while the cache is
    /// full; at the miss ceiling the cell is retired for good.
    pub fn record_miss(&mut self) {
        if self.size == CACHE_LIMIT {
            if self.misses == MISS_LIMIT {
                self.disable();
            } else {
                self.misses += 1;
            }
        }
    }

    pub fn insert(&mut self, key: String, value: Value) {
        if !self.enabled {
            return;
        }
        if self.size >= CACHE_LIMIT {
            if let Some(evicted) = self.cache.keys().next().cloned() {
                self.cache.remove(&evicted);
            }
        } else {
            self.size += 1;
        }
        self.cache.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn fingerprint_renders_decimal_with_trailing_commas() {
        let key = Memo::fingerprint(&[
            Value::Int(10),
            Value::Int(-3),
            Value::big(BigInt::from(1) << 70),
        ]);
        assert_eq!(
            key.as_deref(),
            Some("10,-3,1180591620717411303424,")
        );
    }

    #[test]
    fn fingerprint_refuses_non_numeric_arguments() {
        assert!(Memo::fingerprint(&[Value::Int(1), Value::Bool(true)]).is_none());
        assert!(Memo::fingerprint(&[Value::string("1")]).is_none());
    }

    #[test]
    fn hits_reset_the_miss_counter() {
        let mut memo = Memo::new(true);
        memo.insert("1,".into(), Value::Int(1));
        for _ in 0..5 {
            memo.record_miss();
        }
        assert_eq!(memo.lookup("1,"), Some(Value::Int(1)));
        assert_eq!(memo.misses, 0);
    }

    #[test]
    fn misses_only_age_a_full_cache() {
        let mut memo = Memo::new(true);
        memo.record_miss();
        assert_eq!(memo.misses, 0);
        for i in 0..CACHE_LIMIT {
            memo.insert(format!("{i},"), Value::Int(i as i64));
        }
        memo.record_miss();
        assert_eq!(memo.misses, 1);
    }

    #[test]
    fn full_cache_evicts_one_entry_per_insert() {
        let mut memo = Memo::new(true);
        for i in 0..CACHE_LIMIT + 10 {
            memo.insert(format!("{i},"), Value::Int(i as i64));
        }
        assert_eq!(memo.size(), CACHE_LIMIT);
        assert_eq!(memo.cache.len(), CACHE_LIMIT);
    }

    #[test]
    fn miss_ceiling_retires_the_cell() {
        let mut memo = Memo::new(true);
        for i in 0..CACHE_LIMIT {
            memo.insert(format!("{i},"), Value::Int(i as i64));
        }
        memo.misses = MISS_LIMIT;
        memo.record_miss();
        assert!(!memo.enabled());
        assert!(memo.cache.is_empty());
    }

    #[test]
    fn disabled_cell_ignores_inserts() {
        let mut memo = Memo::new(true);
        memo.disable();
        memo.insert("1,".into(), Value::Int(1));
        assert_eq!(memo.lookup("1,"), None);
        assert_eq!(memo.size(), 0);
    }
}
