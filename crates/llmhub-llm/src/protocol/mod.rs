//! Wire format types for provider-specific API protocols
//!
//! Each module holds plain serde structs matching one provider's JSON API.
//! They only appear at the HTTP boundary; everything else works on the
//! canonical types.

pub mod anthropic;
pub mod dashscope;
pub mod google;
pub mod openai;
