/// Monotonic millisecond clock, wraps after ~49 days.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        C::now_ms(self)
    }
}
