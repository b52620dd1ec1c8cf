//! Command line interface and interactive prompts.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::config::{StitchConfig, DEFAULT_OUTPUT_FILE_NAME};
use crate::error::{PipelineError, PipelineResult};

/// Cut a folder of clips to the beat of its soundtrack.
#[derive(Debug, Clone, Parser)]
#[command(name = "beatcut", version, about = "Beat-synchronized highlight video stitcher")]
pub struct Cli {
    /// Folder containing the source clips
    #[arg(env = "BEATCUT_CLIPS_DIR")]
    pub clips_dir: Option<PathBuf>,

    /// Folder containing the soundtrack [default: <CLIPS_DIR>/Audio]
    #[arg(long, env = "BEATCUT_AUDIO_DIR")]
    pub audio_dir: Option<PathBuf>,

    /// Folder receiving the stitched video [default: <CLIPS_DIR>]
    #[arg(short, long, env = "BEATCUT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name of the stitched video
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE_NAME)]
    pub output_name: String,

    /// Clips cut into flash sets (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub long: Vec<String>,

    /// Clips held as straight long cuts (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub timelapse: Vec<String>,

    /// Precomputed beat times (JSON array or whitespace separated seconds)
    #[arg(long, env = "BEATCUT_BEATS_FILE")]
    pub beats_file: Option<PathBuf>,

    /// Seed for the pattern draws
    #[arg(long, env = "BEATCUT_SEED")]
    pub seed: Option<u64>,

    /// Print the plan as JSON without rendering
    #[arg(long)]
    pub dry_run: bool,

    /// Do not write the plan manifest next to the output
    #[arg(long)]
    pub no_manifest: bool,

    /// Prompt for the folder and clip categories
    #[arg(short, long)]
    pub interactive: bool,
}

impl Cli {
    /// Build the run configuration; the clip folder must be known by now.
    pub fn into_config(self) -> PipelineResult<StitchConfig> {
        let clips_dir = self
            .clips_dir
            .ok_or_else(|| PipelineError::config("no clip folder given (pass CLIPS_DIR or --interactive)"))?;

        let mut config = StitchConfig::from_env(clips_dir);
        config.audio_dir = self.audio_dir;
        config.output_dir = self.output_dir;
        config.output_file_name = self.output_name;
        config.long_clips = clean_names(self.long);
        config.timelapse_clips = clean_names(self.timelapse);
        config.beats_file = self.beats_file;
        config.seed = self.seed;
        config.write_manifest = !self.no_manifest;
        Ok(config)
    }

    /// Fill missing inputs by asking on `output` and reading `input`.
    pub fn prompt_missing<R: BufRead, W: Write>(
        mut self,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<Self> {
        if self.clips_dir.is_none() {
            let answer = prompt_line(
                input,
                output,
                "Please enter the path to the folder containing videos: ",
            )?;
            if !answer.is_empty() {
                self.clips_dir = Some(PathBuf::from(answer));
            }
        }
        if self.long.is_empty() {
            self.long = parse_name_list(&prompt_line(
                input,
                output,
                "Long clips for flash sets (comma separated, empty for none): ",
            )?);
        }
        if self.timelapse.is_empty() {
            self.timelapse = parse_name_list(&prompt_line(
                input,
                output,
                "Timelapse clips (comma separated, empty for none): ",
            )?);
        }
        Ok(self)
    }
}

/// Print `question` and read one trimmed line; end of input reads as empty.
pub fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<String> {
    output.write_all(question.as_bytes())?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Split a comma separated answer into clip names.
pub fn parse_name_list(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_name_list() {
        assert_eq!(
            parse_name_list(" IMG_1.MOV, IMG_7 ,,IMG_12.mp4 "),
            vec!["IMG_1.MOV", "IMG_7", "IMG_12.mp4"]
        );
        assert!(parse_name_list("   ").is_empty());
    }

    #[test]
    fn test_cli_parses_lists_and_flags() {
        let cli = Cli::try_parse_from([
            "beatcut",
            "/videos/trip",
            "--long",
            "IMG_1.MOV,IMG_2.MOV",
            "--timelapse",
            "IMG_9.MOV",
            "--seed",
            "42",
            "--dry-run",
            "--no-manifest",
        ])
        .unwrap();

        assert_eq!(cli.long, vec!["IMG_1.MOV", "IMG_2.MOV"]);
        assert!(cli.dry_run);

        let config = cli.into_config().unwrap();
        assert_eq!(config.clips_dir, PathBuf::from("/videos/trip"));
        assert_eq!(config.timelapse_clips, vec!["IMG_9.MOV"]);
        assert_eq!(config.seed, Some(42));
        assert!(!config.write_manifest);
        assert_eq!(config.output_file_name, "stitched_video.mp4");
    }

    #[test]
    fn test_missing_folder_is_config_error() {
        let cli = Cli::try_parse_from(["beatcut", "--output-name", "x.mp4"]).unwrap();
        let cli = Cli { clips_dir: None, ..cli };
        assert!(matches!(cli.into_config(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_prompts_fill_missing_inputs() {
        let cli = Cli::try_parse_from(["beatcut", "--interactive", "--timelapse", "IMG_3"]).unwrap();
        assert!(cli.interactive);
        let cli = Cli { clips_dir: None, ..cli };
        let mut input = Cursor::new("/videos/trip\nIMG_1.MOV, IMG_2.MOV\n");
        let mut output = Vec::new();

        let cli = cli.prompt_missing(&mut input, &mut output).unwrap();

        assert_eq!(cli.clips_dir, Some(PathBuf::from("/videos/trip")));
        assert_eq!(cli.long, vec!["IMG_1.MOV", "IMG_2.MOV"]);
        assert_eq!(cli.timelapse, vec!["IMG_3"]);

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("folder containing videos"));
        assert!(!shown.contains("Timelapse"));
    }

    #[test]
    fn test_prompt_at_end_of_input_is_empty() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert_eq!(prompt_line(&mut input, &mut output, "? ").unwrap(), "");
    }
}
