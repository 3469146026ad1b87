extern crate env_logger;
#[macro_use]
extern crate log;

use anyhow::{bail, Result};
use clap::Parser;

mod clean;
mod cli;
mod file;
mod io;
mod plot;
mod preset;
mod table;
mod venn;
mod volcano;

use cli::{Cli, Commands};

fn try_main(cli: Cli) -> Result<()> {
    info!("deseqkit v{}", cli::VERSION);

    match cli.command {
        Commands::Clean {
            inputs,
            sample,
            output,
            min_len,
            alphabet,
            reserved,
            report,
        } => {
            let inputs = match sample {
                Some(sample) => {
                    info!("Using the read pair of sample {sample}");
                    clean::sample_inputs(&sample)
                }
                None => inputs,
            };

            let outputs = match output {
                Some(_) if inputs.len() != 1 => {
                    bail!("-o/--output can only be used with a single input file")
                }
                Some(output) => vec![output],
                None => inputs.iter().map(|i| clean::clean_output_path(i)).collect(),
            };

            let opts = clean::CleanOpts {
                min_len,
                alphabet,
                reserved,
            };

            println!("{}", clean::CleanStats::display_header());
            let mut reports = Vec::with_capacity(inputs.len());
            for (input, output) in inputs.iter().zip(&outputs) {
                let file_report = clean::clean_file(input, output, &opts)?;
                println!("{}\t{}", input, file_report.stats);
                reports.push(file_report);
            }

            if let Some(report) = report {
                file::write_json(&report, &reports)?;
                info!("Wrote cleaning report to {report}");
            }

            info!("Completed successfully.")
        }
        Commands::Volcano {
            input,
            preset,
            fc_threshold,
            p_threshold,
            top_n,
            label_min_neg_log10_p,
            label_min_abs_fc,
            output,
            summary,
        } => {
            let fc_threshold = match fc_threshold {
                Some(v) => {
                    info!("Using specified fold change threshold: {v}");
                    v
                }
                None => {
                    let v = preset::get_fc_threshold(&preset);
                    info!("Using preset fold change threshold {v}");
                    v
                }
            };
            let labels = preset::get_label_rule(
                &preset,
                top_n,
                label_min_neg_log10_p,
                label_min_abs_fc,
            );
            let opts = volcano::VolcanoOpts::new(fc_threshold, p_threshold, labels);

            let output = output.unwrap_or_else(|| volcano::default_output_path(&input));
            let volcano_summary = volcano::volcano(&input, &output, &opts)?;

            if let Some(summary) = summary {
                file::write_json(&summary, &volcano_summary)?;
                info!("Wrote summary to {summary}");
            }

            info!("Completed successfully.")
        }
        Commands::Venn {
            table_a,
            table_b,
            id_col,
            fc_col,
            p_col,
            window_a,
            window_b,
            direction_a,
            direction_b,
            label_a,
            label_b,
            output,
        } => {
            let opts = venn::VennOpts {
                layout: table::ColumnLayout {
                    id: id_col,
                    fc: fc_col,
                    pvalue: p_col,
                },
                set_a: venn::SetSelection {
                    window: window_a,
                    direction: direction_a,
                },
                set_b: venn::SetSelection {
                    window: window_b,
                    direction: direction_b,
                },
                label_a,
                label_b,
            };

            let shared = venn::venn(&table_a, &table_b, &output, &opts)?;

            info!("Overlapping Genes:");
            for gene in shared {
                println!("{gene}");
            }
        }
    };
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    // usage errors exit with 1, rather than clap's default of 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = try_main(cli) {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
