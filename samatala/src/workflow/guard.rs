//! Scoped "leveling off while the mesh changes".

use std::ops::{Deref, DerefMut};

use log::debug;

use super::host::MotionDevice;

/// Disables mesh correction for its lifetime and restores the captured
/// state on drop.
///
/// Phases that stay open across invocations hand the captured state to
/// the session with [`LevelingGuard::into_saved`] and later rebuild a
/// guard from it with [`LevelingGuard::resume`].
pub struct LevelingGuard<'a, H: MotionDevice + ?Sized> {
    host: &'a mut H,
    saved: bool,
    restore: bool,
}

impl<'a, H: MotionDevice + ?Sized> LevelingGuard<'a, H> {
    /// Capture the current state and disable correction.
    pub fn acquire(host: &'a mut H) -> Self {
        let saved = host.leveling_enabled();
        host.set_leveling_enabled(false);
        debug!("[Level] Correction suspended (was {})", saved);
        Self {
            host,
            saved,
            restore: true,
        }
    }

    /// Re-enter a suspension started earlier with `saved` as the state to
    /// restore.
    pub fn resume(host: &'a mut H, saved: bool) -> Self {
        host.set_leveling_enabled(false);
        Self {
            host,
            saved,
            restore: true,
        }
    }

    /// State that will be restored
    #[inline]
    pub fn saved(&self) -> bool {
        self.saved
    }

    /// Leave correction disabled and return the state to restore later.
    pub fn into_saved(mut self) -> bool {
        self.restore = false;
        self.saved
    }
}

impl<H: MotionDevice + ?Sized> Deref for LevelingGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: MotionDevice + ?Sized> DerefMut for LevelingGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: MotionDevice + ?Sized> Drop for LevelingGuard<'_, H> {
    fn drop(&mut self) {
        if self.restore {
            self.host.set_leveling_enabled(self.saved);
            debug!("[Level] Correction restored to {}", self.saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::XyPos;

    #[derive(Default)]
    struct Axis {
        enabled: bool,
        toggles: usize,
    }

    impl MotionDevice for Axis {
        fn current_xy(&self) -> XyPos {
            XyPos::default()
        }
        fn current_z(&self) -> f32 {
            0.0
        }
        fn move_to(&mut self, _pos: XyPos, _z: f32) {}
        fn synchronize(&mut self) {}
        fn set_leveling_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
            self.toggles += 1;
        }
        fn leveling_enabled(&self) -> bool {
            self.enabled
        }
    }

    #[test]
    fn test_restores_on_drop() {
        let mut axis = Axis {
            enabled: true,
            ..Default::default()
        };
        {
            let guard = LevelingGuard::acquire(&mut axis);
            assert!(!guard.leveling_enabled());
            assert!(guard.saved());
        }
        assert!(axis.enabled);
    }

    #[test]
    fn test_restores_on_early_return() {
        fn fails(axis: &mut Axis) -> Result<(), ()> {
            let _guard = LevelingGuard::acquire(axis);
            Err(())
        }
        let mut axis = Axis {
            enabled: true,
            ..Default::default()
        };
        assert!(fails(&mut axis).is_err());
        assert!(axis.enabled);
    }

    #[test]
    fn test_saved_state_spans_guards() {
        let mut axis = Axis {
            enabled: true,
            ..Default::default()
        };
        let saved = LevelingGuard::acquire(&mut axis).into_saved();
        assert!(!axis.enabled);

        drop(LevelingGuard::resume(&mut axis, saved));
        assert!(axis.enabled);
    }
}
