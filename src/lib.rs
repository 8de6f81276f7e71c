// lib.rs
pub mod alignment;
pub mod assembly;
pub mod bam;
pub mod checker;
pub mod cigar;
pub mod faidx;
pub mod record;
pub mod report;
pub mod sequence;
pub mod support;
