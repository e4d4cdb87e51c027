//! 問題集 (Mondaishū): storage and session logic for the Q&A quiz viewer.
//!
//! [`db`] persists question sets and media blobs, [`session`] drives a shuffled
//! run through one question set, and [`media`] turns a question's media reference
//! into something the terminal can show.

pub mod db;
pub mod key;
pub mod media;
pub mod player;
pub mod session;
pub mod shitsumon;
