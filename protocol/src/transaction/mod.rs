//! # Transaction Module
//!
//! Signed transfers of value between wallet addresses.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        Transaction, TransactionInput, OutputMap (the wire shape)
//! signing.rs      create, amend, and reward; every path that signs
//! verification.rs sum and signature validation, TransactionError
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Create**: [`Transaction::new`] splits the sender's balance between
//!    the recipient and the sender's change, then signs the output map.
//! 2. **Amend**: while still pending, [`Transaction::update`] adds another
//!    recipient and re-signs. One pending transaction per sender.
//! 3. **Validate**: pools and chains run [`Transaction::validate`].
//! 4. **Mine**: valid transactions plus one [`Transaction::reward`] become
//!    a block's data.
//!
//! Amounts are `u64` integers. The sum of the output map always equals the
//! input amount.

pub mod signing;
pub mod types;
pub mod verification;

pub use types::{OutputMap, Transaction, TransactionInput};
pub use verification::TransactionError;
