mod common;

use std::sync::Arc;

use clap::Parser;
use ytgrab::cli::output::render_info;
use ytgrab::cli::{self, Args, OutputFormatter, Outcome};
use ytgrab::{GrabError, Route};

use common::{sample_info, MockExtractor, VIDEO_URL};

fn args(extra: &[&str], output: &std::path::Path) -> Args {
    let mut argv = vec!["ytgrab", "--quiet", "-o", output.to_str().unwrap()];
    argv.extend_from_slice(extra);
    argv.push(VIDEO_URL);
    Args::try_parse_from(argv).unwrap()
}

fn formatter(args: &Args) -> Arc<OutputFormatter> {
    Arc::new(OutputFormatter::new(args.verbosity_level()))
}

#[tokio::test]
async fn list_never_writes_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("downloads");
    let extractor = Arc::new(MockExtractor::default());

    for flags in [&["-l"][..], &["-l", "-i"][..], &["-i"][..], &["-g"][..]] {
        let args = args(flags, &output);
        let outcome = cli::run(&args, extractor.clone(), Route::Direct, formatter(&args))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Inspected);
    }

    assert!(!output.exists());
    assert_eq!(extractor.download_calls(), 0);
    assert_eq!(extractor.info_calls(), 4);
}

#[tokio::test]
async fn existing_output_dir_stays_empty_when_listing() {
    let dir = tempfile::tempdir().unwrap();
    let args = args(&["-l", "-q", "audio"], dir.path());

    cli::run(&args, Arc::new(MockExtractor::default()), Route::Direct, formatter(&args))
        .await
        .unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn info_output_carries_library_metadata() {
    colored::control::set_override(false);
    let info = sample_info();
    let rendered = render_info(&info);

    assert!(rendered.contains(&format!("Title: {}", info.title)));
    assert!(rendered.contains(&format!("Uploader: {}", info.uploader.as_deref().unwrap())));
    assert!(rendered.contains("Duration: 3:32 (212 seconds)"));
}

#[tokio::test]
async fn download_writes_into_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("downloads");
    let extractor = Arc::new(MockExtractor::default());
    let args = args(&["-q", "audio"], &output);

    let outcome = cli::run(&args, extractor.clone(), Route::Direct, formatter(&args))
        .await
        .unwrap();

    let expected = output.join("Never Gonna Give You Up.mp3");
    assert_eq!(outcome, Outcome::Downloaded(expected.clone()));
    assert!(expected.is_file());

    let request = extractor.downloads.lock().unwrap()[0].clone();
    assert_eq!(request.format, "bestaudio/best");
    assert!(request.extract_audio);
}

#[tokio::test]
async fn explicit_format_wins_over_quality() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::default());
    let args = args(&["-q", "audio", "-f", "22"], dir.path());

    cli::run(&args, extractor.clone(), Route::Direct, formatter(&args))
        .await
        .unwrap();

    let request = extractor.downloads.lock().unwrap()[0].clone();
    assert_eq!(request.format, "22");
    assert!(!request.extract_audio);
}

#[tokio::test]
async fn failures_surface_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    let args = args(&["-i"], dir.path());

    let err = cli::run(&args, Arc::new(MockExtractor::failing()), Route::Direct, formatter(&args))
        .await
        .unwrap_err();
    assert!(matches!(err, GrabError::VideoUnavailable(_)));
}

#[tokio::test]
async fn invalid_url_fails_before_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(MockExtractor::default());
    let args = Args::try_parse_from([
        "ytgrab",
        "--quiet",
        "-o",
        dir.path().to_str().unwrap(),
        "https://vimeo.com/1",
    ])
    .unwrap();

    let err = cli::run(&args, extractor.clone(), Route::Direct, formatter(&args))
        .await
        .unwrap_err();
    assert!(matches!(err, GrabError::InvalidUrl(_)));
    assert_eq!(extractor.info_calls(), 0);
    assert_eq!(extractor.download_calls(), 0);
}
