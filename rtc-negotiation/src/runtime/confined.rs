use std::fmt;
use std::marker::PhantomData;

use log::trace;
use shared::error::Result;

use super::{ExecutionContext, SlotKey, Slots};

/// Handle to a value that lives on, and is only ever touched by, one
/// [`ExecutionContext`].
///
/// The handle is `Send + Sync` regardless of `T`; the value is reached only by
/// posting closures that run on the owning context.
pub struct Confined<T> {
    key: SlotKey,
    ctx: ExecutionContext,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Confined<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            ctx: self.ctx.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Confined<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Confined")
            .field("key", &self.key)
            .field("context", &self.ctx.name())
            .finish()
    }
}

impl<T: 'static> Confined<T> {
    pub(super) fn new(key: SlotKey, ctx: ExecutionContext) -> Self {
        Self {
            key,
            ctx,
            _marker: PhantomData,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Runs `f` against the confined value on its owning context.
    ///
    /// Silently skipped if the value was already released.
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let key = self.key;
        self.ctx.post_local(move |slots: &mut Slots| {
            if let Some(value) = slots.get_mut::<T>(key) {
                f(value);
            } else {
                trace!("confined value {key} already released");
            }
        })
    }

    /// Drops the confined value on its owning context.
    pub fn release(&self) -> Result<()> {
        let key = self.key;
        self.ctx.post_local(move |slots: &mut Slots| {
            slots.remove(key);
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_confined_value_is_not_send() -> Result<()> {
        let ctx = ExecutionContext::new("confined");
        ctx.start()?;

        // Rc is !Send, it can still be owned by a context.
        let shared = ctx.confine(|| Rc::new(5u32))?;
        let (tx, rx) = mpsc::channel();
        shared.post(move |v| {
            let _ = tx.send(**v + Rc::strong_count(v) as u32);
        })?;
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 6);

        ctx.stop();
        Ok(())
    }

    #[test]
    fn test_release_skips_later_posts() -> Result<()> {
        let ctx = ExecutionContext::new("release");
        ctx.start()?;

        let value = ctx.confine(Vec::<u8>::new)?;
        let (tx, rx) = mpsc::channel::<usize>();
        let tx2 = tx.clone();
        value.post(move |v| {
            v.push(1);
            let _ = tx.send(v.len());
        })?;
        value.release()?;
        value.post(move |v| {
            let _ = tx2.send(v.len());
        })?;

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        ctx.stop();
        assert!(rx.try_recv().is_err());
        Ok(())
    }
}
