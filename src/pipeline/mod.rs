//! Pipeline stages for document ingestion.
//!
//! Each submodule implements exactly one step, so each can be tested on
//! its own and the two network clients can be swapped behind their traits.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ ocr ──▶ classify ──▶ truncate ──▶ inference ──▶ extract ──▶ normalize
//!          (HTTP)   (keywords)   (budget)      (HTTP)        (JSON)      (records)
//! ```
//!
//! 1. [`ocr`]: upload the document, get the transcript back
//! 2. [`classify`]: pick a category when the caller did not
//! 3. [`truncate`]: keep the transcript inside the model's context budget
//! 4. [`inference`]: stream the model's answer and aggregate it
//! 5. [`extract`]: isolate the JSON payload in the model's prose
//! 6. [`normalize`]: map the payload onto typed records
//!
//! Prompt assembly between steps 3 and 4 lives in [`crate::prompts`].

pub mod classify;
pub mod extract;
pub mod inference;
pub mod normalize;
pub mod ocr;
pub mod truncate;
