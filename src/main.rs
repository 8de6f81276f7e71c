use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::io::{self, BufWriter};
use std::num::NonZeroUsize;
use std::sync::Arc;
use svasm::assembly::{AssemblyVariant, ExtendedAssembly, GappedAssembly};
use svasm::bam::load_reads;
use svasm::checker::{MismatchChecker, SupportConfig};
use svasm::faidx::ContigIndex;
use svasm::record::Record;
use svasm::report::{self, SupportReport};

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Path to the BAM/SAM file with the reads to evaluate.
    #[clap(short = 'r', long, value_parser)]
    reads: String,

    /// Path to the FASTA file with the contig sequences. The index is created if missing.
    #[clap(short = 'c', long, value_parser)]
    contigs: String,

    /// Contig to use (repeatable). Defaults to every contig in natural order.
    #[clap(long = "contig", value_parser)]
    contig_names: Vec<String>,

    /// Minimum number of bases a read must overlap a contig by.
    #[clap(long, value_parser, default_value_t = 16)]
    min_overlap: usize,

    /// Maximum number of mismatching bases within the overlap.
    #[clap(long, value_parser, default_value_t = 1)]
    max_mismatches: usize,

    /// Report the assemblies on the opposite strand.
    #[clap(long, action)]
    flip: bool,

    /// Also write the reports as a binary snapshot to this path.
    #[clap(long, value_parser)]
    snapshot: Option<String>,

    /// Number of threads for parallel processing.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN))]
    num_threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Local assembly read-support evaluation.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Evaluate read support for each contig on its own
    Support {
        #[clap(flatten)]
        common: CommonOpts,

        /// Bases to remove from the start of each contig after evaluation
        #[clap(long, value_parser, default_value_t = 0)]
        trim_left: usize,

        /// Bases to remove from the end of each contig after evaluation
        #[clap(long, value_parser, default_value_t = 0)]
        trim_right: usize,
    },
    /// Join the contigs, in the given order, into one gapped assembly and evaluate read support
    Merge {
        #[clap(flatten)]
        common: CommonOpts,

        /// Name of the joined assembly
        #[clap(short = 'n', long, value_parser, default_value = "merged")]
        name: String,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let (common, reports) = match args {
        Args::Support {
            common,
            trim_left,
            trim_right,
        } => {
            let (contigs, reads, checker) = initialize(&common)?;
            let reports = contigs
                .into_par_iter()
                .filter_map(|(name, bases)| {
                    let mut assembly = ExtendedAssembly::new(&name, bases);
                    for read in &reads {
                        add_support(&mut assembly, &checker, read);
                    }
                    info!(
                        "{}: {} support entries from {} fragments",
                        name,
                        assembly.supported().support_count(),
                        assembly.supported().support_fragments().len()
                    );

                    let assembly = if trim_left > 0 || trim_right > 0 {
                        match assembly.trim(trim_left, trim_right) {
                            Some(trimmed) => trimmed,
                            None => {
                                warn!("{name}: trimming {trim_left}/{trim_right} bases leaves nothing, skipping");
                                return None;
                            }
                        }
                    } else {
                        assembly
                    };

                    let variant = AssemblyVariant::from(assembly);
                    let variant = if common.flip {
                        variant.flip_strand()
                    } else {
                        variant
                    };
                    Some(SupportReport::from_variant(&variant))
                })
                .collect::<Vec<_>>();
            (common, reports)
        }
        Args::Merge { common, name } => {
            let (contigs, reads, checker) = initialize(&common)?;
            let sources = contigs
                .into_iter()
                .map(|(contig, bases)| ExtendedAssembly::new(&contig, bases))
                .collect();

            let mut gapped = GappedAssembly::new(&name, sources);
            for read in &reads {
                if !gapped.try_add_support(&checker, read) {
                    gapped.try_add_support(&checker, &Arc::new(read.reverse_complemented()));
                }
            }
            info!(
                "{}: {} support entries over {} segments",
                name,
                gapped.supported().support_count(),
                gapped.sources().len()
            );

            let variant = AssemblyVariant::from(gapped);
            let variant = if common.flip {
                variant.flip_strand()
            } else {
                variant
            };
            (common, vec![SupportReport::from_variant(&variant)])
        }
    };

    report::write_tsv(&reports, BufWriter::new(io::stdout().lock()))?;
    if let Some(path) = &common.snapshot {
        report::write_snapshot(&reports, path)?;
        info!("Wrote {} reports to {}", reports.len(), path);
    }

    Ok(())
}

/// Try the read as given, then on the opposite strand
fn add_support(assembly: &mut ExtendedAssembly, checker: &MismatchChecker, read: &Arc<Record>) {
    if !assembly.try_add_support(checker, read, None) {
        assembly.try_add_support(checker, &Arc::new(read.reverse_complemented()), None);
    }
}

type Inputs = (Vec<(String, Vec<u8>)>, Vec<Arc<Record>>, MismatchChecker);

/// Initialize logging and the thread pool, then load contigs and reads
fn initialize(common: &CommonOpts) -> io::Result<Inputs> {
    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    // Configure thread pool
    ThreadPoolBuilder::new()
        .num_threads(common.num_threads.into())
        .build_global()
        .map_err(|e| io::Error::other(format!("Failed to build thread pool: {e}")))?;

    let index = ContigIndex::open(&common.contigs)?;
    let names = if common.contig_names.is_empty() {
        let mut names = index.names().to_vec();
        names.sort_by(|a, b| natord::compare(a, b));
        names
    } else {
        common.contig_names.clone()
    };

    let contigs = names
        .into_iter()
        .map(|name| index.fetch(&name).map(|bases| (name, bases)))
        .collect::<io::Result<Vec<_>>>()?;
    info!("Loaded {} contigs from {}", contigs.len(), common.contigs);

    let reads = load_reads(&common.reads)?;
    let checker = MismatchChecker::new(SupportConfig {
        min_overlap: common.min_overlap,
        max_mismatches: common.max_mismatches,
    });

    Ok((contigs, reads, checker))
}
