//! End-to-end tests for the svasm binary on a small FASTA + SAM pair

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use svasm::report::read_snapshot;
use tempfile::TempDir;

const CONTIG_1: &str = "GCTAAAGACAATTACATAACATACACGTCAGCACGAAACT";
const CONTIG_2: &str = "TGTTGGCCCAGTGTGAATCGCTTAAGGGTT";

fn write_inputs(dir: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
    let fasta = dir.join("contigs.fa");
    fs::write(&fasta, format!(">ctg2\n{CONTIG_2}\n>ctg1\n{CONTIG_1}\n"))?;

    let reads = [
        ("r1", &CONTIG_1[0..20]),
        ("r2", &CONTIG_1[10..30]),
        ("r4", &CONTIG_2[5..25]),
        ("r5", "TTTTTTTTTTTTTTTTTTTT"),
    ];
    let mut sam = String::from("@HD\tVN:1.6\tSO:unsorted\n");
    sam.push_str(&format!("@SQ\tSN:ctg1\tLN:{}\n", CONTIG_1.len()));
    sam.push_str(&format!("@SQ\tSN:ctg2\tLN:{}\n", CONTIG_2.len()));
    for (name, bases) in reads {
        sam.push_str(&format!(
            "{name}\t4\t*\t0\t0\t*\t*\t0\t0\t{bases}\t{}\n",
            "I".repeat(bases.len())
        ));
    }
    let sam_path = dir.join("reads.sam");
    fs::write(&sam_path, sam)?;

    Ok((fasta, sam_path))
}

fn run_svasm(args: &[&str]) -> std::io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_svasm")).args(args).output()
}

fn data_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn qualities(spans: &[(usize, u8)]) -> String {
    spans
        .iter()
        .flat_map(|&(len, q)| std::iter::repeat(q.to_string()).take(len))
        .collect::<Vec<_>>()
        .join(",")
}

#[test]
fn test_support_command() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let (fasta, sam) = write_inputs(temp_dir.path())?;
    let snapshot = temp_dir.path().join("reports.bin");

    let output = run_svasm(&[
        "support",
        "-r",
        sam.to_str().unwrap(),
        "-c",
        fasta.to_str().unwrap(),
        "--min-overlap",
        "8",
        "--max-mismatches",
        "0",
        "-t",
        "2",
        "--snapshot",
        snapshot.to_str().unwrap(),
    ])?;
    assert!(
        output.status.success(),
        "svasm failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines = data_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        format!("ctg1\textended\t40\t2\t2\t30\t{}", qualities(&[(30, 40), (10, 0)]))
    );
    assert_eq!(
        lines[1],
        format!(
            "ctg2\textended\t30\t1\t1\t26\t{}",
            qualities(&[(5, 0), (20, 40), (5, 0)])
        )
    );

    let reports = read_snapshot(snapshot.to_str().unwrap())?;
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].support[1].fragment, "r2");
    assert_eq!(reports[0].support[1].offset, 10);

    Ok(())
}

#[test]
fn test_support_command_trim_and_flip() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let (fasta, sam) = write_inputs(temp_dir.path())?;

    let output = run_svasm(&[
        "support",
        "-r",
        sam.to_str().unwrap(),
        "-c",
        fasta.to_str().unwrap(),
        "--contig",
        "ctg1",
        "--min-overlap",
        "8",
        "--max-mismatches",
        "0",
        "--trim-left",
        "5",
        "--trim-right",
        "5",
        "--flip",
    ])?;
    assert!(output.status.success());

    // r1 started before the trimmed window and is dropped; r2 moves to 5
    let lines = data_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0],
        format!(
            "ctg1\textended\t30\t1\t1\t26\t{}",
            qualities(&[(5, 0), (20, 40), (5, 0)])
        )
    );

    Ok(())
}

#[test]
fn test_merge_command() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let (fasta, sam) = write_inputs(temp_dir.path())?;

    let output = run_svasm(&[
        "merge",
        "-r",
        sam.to_str().unwrap(),
        "-c",
        fasta.to_str().unwrap(),
        "--contig",
        "ctg1",
        "--contig",
        "ctg2",
        "--min-overlap",
        "8",
        "--max-mismatches",
        "0",
        "-n",
        "joined",
    ])?;
    assert!(
        output.status.success(),
        "svasm failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines = data_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0],
        format!(
            "joined\tgapped\t71\t3\t3\t28\t{}",
            qualities(&[(30, 40), (16, 0), (20, 40), (5, 0)])
        )
    );

    Ok(())
}
