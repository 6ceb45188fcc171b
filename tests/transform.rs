use anyhow::Result;
use post_sentiment::config::{DEFAULT_CHUNK_SIZE, ExecMode};
use post_sentiment::io::parquet::{open_batches, write_parquet_vec};
use post_sentiment::sentiment::ScoreEngine;
use post_sentiment::testing::*;
use post_sentiment::transform::ChunkedFileTransformer;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

fn dir_entries(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[test]
fn row_count_and_order_survive_any_chunk_size() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("posts.parquet");
    let posts = generated_posts(237);
    write_posts(&src, &posts)?;
    let engine = ScoreEngine::initialize()?;

    for chunk_size in [1, 10, 236, 237, 1_000, DEFAULT_CHUNK_SIZE] {
        let dest = tmp.path().join(format!("out_{chunk_size}.parquet"));
        let stats = ChunkedFileTransformer::new(&engine, chunk_size, ExecMode::Sequential)
            .transform(&src, &dest)?;
        assert_eq!(stats.rows, 237);
        assert_eq!(stats.chunks, 237_usize.div_ceil(chunk_size));
        assert!(stats.bytes_written > 0);

        let scored = read_scored(&dest)?;
        assert_eq!(scored.len(), posts.len());
        for (out, inp) in scored.iter().zip(&posts) {
            assert_eq!(out.id, inp.id);
            assert_eq!(out.title, inp.title);
            assert_eq!(out.selftext, inp.selftext);
            assert_eq!(out.score, inp.score);
        }
    }
    Ok(())
}

#[test]
fn chunk_size_does_not_change_derived_values() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("posts.parquet");
    write_posts(&src, &generated_posts(1_500))?;
    let engine = ScoreEngine::initialize()?;

    let small = tmp.path().join("small.parquet");
    let large = tmp.path().join("large.parquet");
    ChunkedFileTransformer::new(&engine, 10, ExecMode::Sequential).transform(&src, &small)?;
    ChunkedFileTransformer::new(&engine, 10_000, ExecMode::Sequential).transform(&src, &large)?;

    assert_eq!(read_scored(&small)?, read_scored(&large)?);
    Ok(())
}

#[test]
fn parallel_transform_matches_sequential() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("posts.parquet");
    write_posts(&src, &generated_posts(400))?;
    let engine = ScoreEngine::initialize()?;

    let seq = tmp.path().join("seq.parquet");
    let par = tmp.path().join("par.parquet");
    ChunkedFileTransformer::new(&engine, 64, ExecMode::Sequential).transform(&src, &seq)?;
    ChunkedFileTransformer::new(&engine, 64, ExecMode::Parallel { threads: None })
        .transform(&src, &par)?;

    assert_eq!(read_scored(&seq)?, read_scored(&par)?);
    Ok(())
}

#[test]
fn output_row_groups_follow_chunk_size() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("posts.parquet");
    write_posts(&src, &generated_posts(100))?;
    let engine = ScoreEngine::initialize()?;

    let dest = tmp.path().join("out.parquet");
    ChunkedFileTransformer::new(&engine, 25, ExecMode::Sequential).transform(&src, &dest)?;

    let reader = SerializedFileReader::new(fs::File::open(&dest)?)?;
    let meta = reader.metadata();
    assert_eq!(meta.num_row_groups(), 4);
    for i in 0..meta.num_row_groups() {
        assert_eq!(meta.row_group(i).num_rows(), 25);
    }
    assert_eq!(open_batches(&dest, 1_000)?.total_rows, 100);
    Ok(())
}

#[test]
fn empty_file_yields_empty_output() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("empty.parquet");
    write_posts(&src, &[])?;
    let engine = ScoreEngine::initialize()?;

    let dest = tmp.path().join("empty_sentiment.parquet");
    let stats = ChunkedFileTransformer::new(&engine, 10, ExecMode::Sequential).transform(&src, &dest)?;
    assert_eq!(stats.rows, 0);
    assert_eq!(stats.chunks, 0);
    assert!(dest.exists());
    assert!(read_scored(&dest)?.is_empty());
    Ok(())
}

#[test]
fn corrupt_source_leaves_no_destination() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("bad.parquet");
    fs::write(&src, b"this is not parquet at all")?;
    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir)?;
    let engine = ScoreEngine::initialize()?;

    let dest = out_dir.join("bad_sentiment.parquet");
    let result = ChunkedFileTransformer::new(&engine, 10, ExecMode::Sequential).transform(&src, &dest);
    assert!(result.is_err());
    assert!(!dest.exists());
    assert!(dir_entries(&out_dir)?.is_empty());
    Ok(())
}

#[test]
fn failure_after_output_started_leaves_no_destination() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let engine = ScoreEngine::initialize()?;

    // a valid input with many row groups: an enriched file written at chunk 100
    let raw = tmp.path().join("raw.parquet");
    write_posts(&raw, &generated_posts(2_000))?;
    let src = tmp.path().join("posts.parquet");
    ChunkedFileTransformer::new(&engine, 100, ExecMode::Sequential).transform(&raw, &src)?;

    // smash every column chunk of a late row group, keep the footer intact
    let ranges: Vec<(u64, u64)> = {
        let reader = SerializedFileReader::new(fs::File::open(&src)?)?;
        let meta = reader.metadata();
        assert_eq!(meta.num_row_groups(), 20);
        meta.row_group(15).columns().iter().map(|c| c.byte_range()).collect()
    };
    let mut file = fs::OpenOptions::new().write(true).open(&src)?;
    for (start, len) in ranges {
        file.seek(SeekFrom::Start(start))?;
        file.write_all(&vec![0xFF; usize::try_from(len)?])?;
    }
    file.sync_all()?;
    drop(file);

    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir)?;
    let dest = out_dir.join("posts_sentiment.parquet");
    let result = ChunkedFileTransformer::new(&engine, 100, ExecMode::Sequential).transform(&src, &dest);

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("decode chunk"), "{err:#}");
    assert!(!dest.exists());
    assert!(dir_entries(&out_dir)?.is_empty(), "{:?}", dir_entries(&out_dir)?);
    Ok(())
}

#[test]
fn unwritable_destination_is_an_error() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("posts.parquet");
    write_posts(&src, &sample_posts())?;
    let engine = ScoreEngine::initialize()?;

    let missing_dir = tmp.path().join("no_such_dir");
    let dest = missing_dir.join("posts_sentiment.parquet");
    let result = ChunkedFileTransformer::new(&engine, 10, ExecMode::Sequential).transform(&src, &dest);
    assert!(result.is_err());
    assert!(!missing_dir.exists());
    Ok(())
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn chunk_progress_is_logged_at_info() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("posts.parquet");
    write_posts(&src, &generated_posts(30))?;
    let engine = ScoreEngine::with_model(FixedModel(0.1));
    let dest = tmp.path().join("posts_sentiment.parquet");

    let captured = Captured::default();
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        ChunkedFileTransformer::new(&engine, 10, ExecMode::Sequential).transform(&src, &dest)
    })?;

    let log = String::from_utf8(captured.0.lock().unwrap().clone())?;
    assert_eq!(log.matches("chunk scored").count(), 3, "{log}");
    assert!(log.contains("rows_done=30"), "{log}");
    assert!(log.contains("file enriched"), "{log}");
    Ok(())
}

#[derive(Clone, Serialize, Deserialize)]
struct NoComments {
    title: Option<String>,
    full_text: Option<String>,
    selftext: Option<String>,
    score: i64,
}

#[test]
fn schema_mismatch_fails_before_writing() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("partial.parquet");
    write_parquet_vec(
        &src,
        &[NoComments {
            title: Some("hello".into()),
            full_text: None,
            selftext: None,
            score: 3,
        }],
    )?;
    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir)?;
    let engine = ScoreEngine::initialize()?;

    let dest = out_dir.join("partial_sentiment.parquet");
    let err = ChunkedFileTransformer::new(&engine, 10, ExecMode::Sequential)
        .transform(&src, &dest)
        .unwrap_err();
    assert!(format!("{err:#}").contains("num_comments"), "{err:#}");
    assert!(dir_entries(&out_dir)?.is_empty());
    Ok(())
}

#[derive(Clone, Serialize, Deserialize)]
struct MessyPost {
    title: Option<String>,
    full_text: Option<String>,
    selftext: Option<String>,
    score: String,
    num_comments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessyScored {
    score: String,
    score_per_comment: f64,
    sentiment_label: String,
}

#[test]
fn unparseable_numbers_do_not_fail_the_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = tmp.path().join("messy.parquet");
    let rows = vec![
        MessyPost {
            title: Some("I love this".into()),
            full_text: None,
            selftext: None,
            score: "not a number".into(),
            num_comments: Some("4".into()),
        },
        MessyPost {
            title: None,
            full_text: None,
            selftext: None,
            score: "50".into(),
            num_comments: Some("5".into()),
        },
        MessyPost {
            title: None,
            full_text: None,
            selftext: None,
            score: "500".into(),
            num_comments: None,
        },
    ];
    write_parquet_vec(&src, &rows)?;
    let engine = ScoreEngine::initialize()?;

    let dest = tmp.path().join("messy_sentiment.parquet");
    let stats = ChunkedFileTransformer::new(&engine, 2, ExecMode::Sequential).transform(&src, &dest)?;
    assert_eq!(stats.rows, 3);

    let out: Vec<MessyScored> = post_sentiment::io::parquet::read_parquet_vec(&dest)?;
    assert_eq!(out[0].score, "not a number");
    assert_eq!(out[0].score_per_comment, 0.0);
    assert_eq!(out[0].sentiment_label, "positive");
    assert_eq!(out[1].score_per_comment, 10.0);
    assert_eq!(out[2].score_per_comment, 0.0);
    Ok(())
}

#[test]
fn engine_is_reused_across_files() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let engine = ScoreEngine::with_model(FixedModel(0.7));
    let transformer = ChunkedFileTransformer::new(&engine, 3, ExecMode::Sequential);

    for name in ["a", "b"] {
        let src = tmp.path().join(format!("{name}.parquet"));
        write_posts(&src, &sample_posts())?;
        let dest = tmp.path().join(format!("{name}_sentiment.parquet"));
        transformer.transform(&src, &dest)?;
        let scored = read_scored(&dest)?;
        assert_eq!(scored[0].title_sentiment, 0.7);
        assert_eq!(scored[0].sentiment_bucket, "strongly_positive");
        // null title never reaches the model
        assert_eq!(scored[2].title_sentiment, 0.0);
    }
    Ok(())
}
