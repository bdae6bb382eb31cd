// Offer letter pipeline: form → template selection → placeholder table →
// document substitution → record persistence → download.

pub mod form;
pub mod generator;
pub mod handlers;
pub mod placeholders;
pub mod templates;
