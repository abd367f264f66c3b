//! Object pool with prewarm and LIFO reuse.
//!
//! Cell containers are expensive to churn during streaming, so the streamer
//! acquires them here instead of allocating. Released containers keep their
//! identity and are handed out again most-recently-freed first.

pub struct Pool<T> {
    free: Vec<T>,
    factory: Box<dyn FnMut() -> T>,
    created: usize,
}

impl<T> Pool<T> {
    pub fn new(factory: impl FnMut() -> T + 'static) -> Self {
        Self {
            free: Vec::new(),
            factory: Box::new(factory),
            created: 0,
        }
    }

    /// Pre-allocate `count` objects so early acquires never hit the factory.
    pub fn prewarm(&mut self, count: usize) {
        self.free.reserve(count);
        for _ in 0..count {
            let item = (self.factory)();
            self.created += 1;
            self.free.push(item);
        }
        log::debug!("pool prewarmed with {} objects", count);
    }

    /// Take an object, reusing a released one when available.
    pub fn acquire(&mut self) -> T {
        match self.free.pop() {
            Some(item) => item,
            None => {
                self.created += 1;
                log::trace!("pool grew to {} objects", self.created);
                (self.factory)()
            }
        }
    }

    /// Return an object for later reuse.
    pub fn release(&mut self, item: T) {
        self.free.push(item);
    }

    /// Objects currently waiting for reuse.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total objects ever produced by the factory.
    pub fn created(&self) -> usize {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prewarm_fills_pool() {
        let mut pool = Pool::new(|| 0u32);
        pool.prewarm(4);
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.created(), 4);
    }

    #[test]
    fn test_acquire_reuses_released() {
        let mut counter = 0u32;
        let mut pool = Pool::new(move || {
            counter += 1;
            counter
        });

        let first = pool.acquire();
        assert_eq!(first, 1);
        pool.release(first);

        // Reuse, not a fresh allocation
        assert_eq!(pool.acquire(), 1);
        assert_eq!(pool.created(), 1);
    }

    #[test]
    fn test_acquire_grows_when_empty() {
        let mut pool = Pool::new(String::new);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.created(), 2);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_lifo_order() {
        let mut pool = Pool::new(|| 0u32);
        pool.release(1);
        pool.release(2);
        assert_eq!(pool.acquire(), 2);
        assert_eq!(pool.acquire(), 1);
    }
}
