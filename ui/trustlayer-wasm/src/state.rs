//! The page's controller, reachable from event closures.
//!
//! `thread_local!` storage; WASM is single-threaded.

use std::cell::RefCell;
use std::rc::Rc;
use tl_dapp_core::Dapp;

thread_local! {
    static DAPP: RefCell<Option<Rc<Dapp>>> = const { RefCell::new(None) };
}

pub fn install(dapp: Rc<Dapp>) {
    DAPP.with(|slot| *slot.borrow_mut() = Some(dapp));
}

pub fn dapp() -> Option<Rc<Dapp>> {
    DAPP.with(|slot| slot.borrow().clone())
}
