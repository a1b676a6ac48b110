//! Presentation engine for the bilingual MarkdownFlow landing page.
//!
//! A page load resolves the visitor's locale (possibly redirecting),
//! hydrates the static skeleton from the translation catalog, then starts
//! the reveal, ripple and typewriter animations and the diagram adapter.
//! See [`page::boot`] for the entry point.

pub mod animation;
pub mod config;
pub mod diagram;
pub mod dom;
pub mod hydrate;
pub mod i18n;
pub mod page;
pub mod resolver;
pub mod store;
