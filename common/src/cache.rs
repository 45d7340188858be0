use crate::types::OutsideWeather;

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedWeather {
    weather: OutsideWeather,
    fetched_at_ms: u64,
}

/// Single-slot cache for the one configured weather location.
///
/// An expired entry is not dropped: [`WeatherCache::latest`] still returns it
/// so callers can fall back to stale data when a refresh fails.
#[derive(Debug, Clone, Default)]
pub struct WeatherCache {
    slot: Option<CachedWeather>,
}

impl WeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_if_fresh(&self, ttl_ms: u64, now_ms: u64) -> Option<OutsideWeather> {
        let entry = self.slot?;
        (now_ms.saturating_sub(entry.fetched_at_ms) < ttl_ms).then_some(entry.weather)
    }

    pub fn latest(&self) -> Option<OutsideWeather> {
        self.slot.map(|entry| entry.weather)
    }

    pub fn put(&mut self, temperature_c: f64, humidity: f64, now_ms: u64) {
        self.slot = Some(CachedWeather {
            weather: OutsideWeather {
                temperature_c,
                humidity,
            },
            fetched_at_ms: now_ms,
        });
    }

    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.slot
            .map(|entry| now_ms.saturating_sub(entry.fetched_at_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL_MS: u64 = 300_000;

    #[test]
    fn empty_cache_misses() {
        let cache = WeatherCache::new();
        assert_eq!(cache.get_if_fresh(TTL_MS, 0), None);
        assert_eq!(cache.latest(), None);
        assert_eq!(cache.age_ms(10), None);
    }

    #[test]
    fn put_then_get_returns_value_until_ttl() {
        let mut cache = WeatherCache::new();
        cache.put(11.5, 72.0, 1_000);

        let expected = OutsideWeather {
            temperature_c: 11.5,
            humidity: 72.0,
        };
        assert_eq!(cache.get_if_fresh(1, 1_000), Some(expected));
        assert_eq!(cache.get_if_fresh(TTL_MS, 1_000 + TTL_MS - 1), Some(expected));
        assert_eq!(cache.get_if_fresh(TTL_MS, 1_000 + TTL_MS), None);
    }

    #[test]
    fn expired_entry_remains_available_as_latest() {
        let mut cache = WeatherCache::new();
        cache.put(3.0, 90.0, 0);

        assert_eq!(cache.get_if_fresh(TTL_MS, TTL_MS * 10), None);
        assert_eq!(
            cache.latest(),
            Some(OutsideWeather {
                temperature_c: 3.0,
                humidity: 90.0,
            })
        );
        assert_eq!(cache.age_ms(TTL_MS * 10), Some(TTL_MS * 10));
    }

    #[test]
    fn put_overwrites_the_single_slot() {
        let mut cache = WeatherCache::new();
        cache.put(3.0, 90.0, 0);
        cache.put(4.5, 85.0, 500);

        assert_eq!(
            cache.get_if_fresh(TTL_MS, 600),
            Some(OutsideWeather {
                temperature_c: 4.5,
                humidity: 85.0,
            })
        );
        assert_eq!(cache.age_ms(600), Some(100));
    }

    #[test]
    fn clock_running_backwards_counts_as_fresh() {
        let mut cache = WeatherCache::new();
        cache.put(3.0, 90.0, 5_000);
        assert!(cache.get_if_fresh(TTL_MS, 4_000).is_some());
    }
}
