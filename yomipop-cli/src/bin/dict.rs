use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use yomipop_core::dict::build::DictionaryBuilder;
use yomipop_core::{Dictionary, LookupEngine};

/// yomipop dictionary tool — build and query compiled dictionaries.
#[derive(Parser, Debug)]
#[command(name = "yomipop-dict")]
#[command(about = "yomipop dictionary tool — build and query compiled dictionaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a compiled dictionary from source JSON files.
    ///
    /// The data directory must contain JMdict*.json shards,
    /// deconjugator.json and priority.json; kanjidic2.json is picked up
    /// when present.
    Build {
        /// Directory with the source JSON files
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Output dictionary file
        #[arg(short, long, default_value = "yomipop.dict")]
        output: PathBuf,
    },

    /// Look a word up, deconjugating as the hover pipeline would.
    Lookup {
        /// Compiled dictionary file
        #[arg(short, long, default_value = "yomipop.dict")]
        dict: PathBuf,

        /// Text to look up (the word starts at its first character)
        query: String,

        /// Longest lookup prefix considered, in characters
        #[arg(long, default_value = "25")]
        max_length: usize,
    },

    /// Show the kanji-dictionary record for a single character.
    Kanji {
        /// Compiled dictionary file
        #[arg(short, long, default_value = "yomipop.dict")]
        dict: PathBuf,

        /// Kanji literal
        literal: String,
    },

    /// Print artifact statistics.
    Info {
        /// Compiled dictionary file
        #[arg(short, long, default_value = "yomipop.dict")]
        dict: PathBuf,
    },
}

fn run_build(data_dir: PathBuf, output: PathBuf) -> Result<()> {
    let mut jmdict_files = Vec::new();
    for entry in std::fs::read_dir(&data_dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name.starts_with("JMdict") && name.ends_with(".json") {
            jmdict_files.push(path);
        }
    }
    if jmdict_files.is_empty() {
        anyhow::bail!("no JMdict*.json files found in {:?}", data_dir);
    }
    let deconjugator_path = data_dir.join("deconjugator.json");
    let priority_path = data_dir.join("priority.json");
    let kanjidic_path = data_dir.join("kanjidic2.json");

    eprintln!("Loading dictionary data from JSON files...");
    let start = Instant::now();

    let mut builder = DictionaryBuilder::new();
    let entries = builder.import_jmdict(&jmdict_files)?;
    let rules = builder.import_deconjugator(&deconjugator_path)?;
    let priorities = builder.import_priority(&priority_path)?;
    let kanji = if kanjidic_path.exists() {
        builder.import_kanjidic(&kanjidic_path)?
    } else {
        eprintln!("(no kanjidic2.json, skipping kanji records)");
        0
    };

    eprintln!(
        "Imported {} entries, {} rules, {} priorities, {} kanji in {:.2}s",
        entries,
        rules,
        priorities,
        kanji,
        start.elapsed().as_secs_f64()
    );

    eprintln!("Saving to {:?}...", output);
    let start = Instant::now();
    builder.finish().save(&output)?;
    eprintln!("Dictionary saved in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn run_lookup(dict: PathBuf, query: String, max_length: usize) -> Result<()> {
    let dict = Arc::new(Dictionary::load(&dict)?);
    let mut engine = LookupEngine::new(dict, max_length);

    let results = engine.lookup(&query);
    if results.is_empty() {
        eprintln!("No entries found for \"{}\"", query);
        return Ok(());
    }

    for entry in &results {
        let reading = if entry.reading.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.reading)
        };
        let process = if entry.deconjugation.is_empty() {
            String::new()
        } else {
            format!("  ({})", entry.deconjugation.join(", "))
        };
        println!(
            "{}{}{}  match={} score={:.2}",
            entry.written_form, reading, process, entry.match_len, entry.priority
        );
        for (i, sense) in entry.senses.iter().enumerate() {
            let pos = if sense.pos.is_empty() {
                String::new()
            } else {
                format!("  [{}]", sense.pos.join(","))
            };
            println!("  {}. {}{}", i + 1, sense.glosses.join("; "), pos);
        }
    }
    eprintln!("({} results)", results.len());
    Ok(())
}

fn run_kanji(dict: PathBuf, literal: String) -> Result<()> {
    let dict = Dictionary::load(&dict)?;
    match dict.kanji_info(&literal) {
        Some(info) => {
            println!("{}", info.literal);
            println!("  on:       {}", info.onyomi.join(", "));
            println!("  kun:      {}", info.kunyomi.join(", "));
            println!("  meanings: {}", info.meanings.join(", "));
            println!(
                "  strokes: {}  grade: {}  jlpt: {}  freq: {}",
                info.stroke_count, info.grade, info.jlpt, info.frequency
            );
        }
        None => eprintln!("No kanji record for \"{}\"", literal),
    }
    Ok(())
}

fn run_info(dict: PathBuf) -> Result<()> {
    let dict = Dictionary::load(&dict)?;
    println!("entries: {}", dict.len());
    println!("rules:   {}", dict.rules().len());
    println!("kanji:   {}", dict.kanji_count());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build { data_dir, output } => run_build(data_dir, output),
        Commands::Lookup {
            dict,
            query,
            max_length,
        } => run_lookup(dict, query, max_length),
        Commands::Kanji { dict, literal } => run_kanji(dict, literal),
        Commands::Info { dict } => run_info(dict),
    }
}
