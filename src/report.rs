//! Summaries of finished assemblies for downstream tools.

use crate::alignment::Alignment;
use crate::assembly::AssemblyVariant;
use crate::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportSummary {
    pub fragment: String,
    pub first_of_pair: bool,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportReport {
    pub name: String,
    pub kind: String,
    pub bases: String,
    pub base_quality: Vec<u8>,
    pub average_quality: u8,
    pub support: Vec<SupportSummary>,
    pub alignment: Vec<Alignment>,
}

impl SupportReport {
    pub fn from_variant(variant: &AssemblyVariant) -> Self {
        let (kind, alignment) = match variant {
            AssemblyVariant::Extended(_) => ("extended", Vec::new()),
            AssemblyVariant::Gapped(_) => ("gapped", Vec::new()),
            AssemblyVariant::Aligned(aligned) => ("aligned", aligned.alignment().to_vec()),
        };
        let assembly = variant.supported();

        let mut support: Vec<SupportSummary> = assembly
            .support()
            .map(|entry| SupportSummary {
                fragment: entry.fragment().to_string(),
                first_of_pair: entry.record.is_first_of_pair(),
                offset: entry.offset,
            })
            .collect();
        support.sort_by(|a, b| {
            natord::compare(&a.fragment, &b.fragment)
                .then(a.first_of_pair.cmp(&b.first_of_pair))
                .then(a.offset.cmp(&b.offset))
        });

        SupportReport {
            name: assembly.name().to_string(),
            kind: kind.to_string(),
            bases: String::from_utf8_lossy(assembly.bases()).into_owned(),
            base_quality: assembly.base_quality().to_vec(),
            average_quality: assembly.average_base_quality(),
            support,
            alignment,
        }
    }

    pub fn fragment_count(&self) -> usize {
        let mut fragments: Vec<&str> = self.support.iter().map(|s| s.fragment.as_str()).collect();
        fragments.dedup();
        fragments.len()
    }
}

/// One line per assembly: name, kind, length, support entries, distinct
/// fragments, average quality and comma-separated per-base qualities.
pub fn write_tsv<W: Write>(reports: &[SupportReport], mut out: W) -> io::Result<()> {
    writeln!(
        out,
        "#name\tkind\tlength\tsupport\tfragments\taverage_quality\tbase_quality"
    )?;
    for report in reports {
        let qualities = report
            .base_quality
            .iter()
            .map(|q| q.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            report.name,
            report.kind,
            report.bases.len(),
            report.support.len(),
            report.fragment_count(),
            report.average_quality,
            qualities
        )?;
    }
    out.flush()
}

pub fn write_snapshot(reports: &[SupportReport], path: &str) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serde::encode_into_std_write(reports, &mut writer, bincode::config::standard())
        .map_err(|e| io::Error::other(format!("Failed to write snapshot '{path}': {e}")))?;
    writer.flush()
}

pub fn read_snapshot(path: &str) -> io::Result<Vec<SupportReport>> {
    let mut reader = BufReader::new(File::open(path)?);
    bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to read snapshot '{path}': {e}"),
        )
    })
}
