//! RAII guard that calls a given function when constructed,
//! and another when it drops out of scope.
//!
//! Useful for ensuring resource cleanup no matter the return
//! path. Whatever the entry function returns is handed to the
//! exit function, so state captured on entry (for example, which
//! caches were enabled) is restored on exit.
//!
//! Example
//! ```
//! # use flash_map_lib::utilities::guard::Guard;
//! let mut log = Vec::new();
//! {
//!     let mut guard = Guard::new(
//!         &mut log,
//!         |log| { log.push("enter"); 42 },
//!         |log, value| log.push(if value == 42 { "exit" } else { "bad" }),
//!     );
//!     guard.push("inside");
//! }
//! assert_eq!(log, ["enter", "inside", "exit"]);
//! ```

use core::ops::{Deref, DerefMut};

pub struct Guard<'a, T, S, G>
where
    G: FnOnce(&mut T, S),
{
    item: &'a mut T,
    on_exit: Option<(G, S)>,
}

impl<'a, T, S, G> Guard<'a, T, S, G>
where
    G: FnOnce(&mut T, S),
{
    pub fn new<F>(item: &'a mut T, on_entry: F, on_exit: G) -> Self
    where
        F: FnOnce(&mut T) -> S,
    {
        let state = on_entry(item);
        Self { item, on_exit: Some((on_exit, state)) }
    }
}

impl<'a, T, S, G> Deref for Guard<'a, T, S, G>
where
    G: FnOnce(&mut T, S),
{
    type Target = T;
    fn deref(&self) -> &T { self.item }
}

impl<'a, T, S, G> DerefMut for Guard<'a, T, S, G>
where
    G: FnOnce(&mut T, S),
{
    fn deref_mut(&mut self) -> &mut T { self.item }
}

impl<'a, T, S, G> Drop for Guard<'a, T, S, G>
where
    G: FnOnce(&mut T, S),
{
    fn drop(&mut self) {
        if let Some((on_exit, state)) = self.on_exit.take() {
            on_exit(self.item, state);
        }
    }
}
