#![no_std]
#![deny(unsafe_code)]

//! # SYSD Hot Table
//!
//! Lets a permanently flashed *cold* kernel adopt user code from a separately
//! uploaded *hot* image without relinking.
//!
//! Both images agree at link time on two fixed locations: a two-word
//! [`MagicSignature`] slot and a [`HotTable`] of build metadata and user
//! entry points. The hot image fills both at its startup
//! ([`install_hot_table`]). The cold kernel then runs the
//! [handshake](HotRegion::handshake): if the signature matches exactly the
//! table is trusted, otherwise it is zero-filled. [`UserFunctions`] resolves
//! each user symbol from the table, falling back to built-in stubs for
//! anything the hot image did not supply.
//!
//! After the handshake the table is never written again, so readers need no
//! lock.

pub mod functions;
pub mod install;
pub mod magic;
pub mod region;
pub mod table;

pub use functions::*;
pub use install::*;
pub use magic::*;
pub use region::*;
pub use table::*;
