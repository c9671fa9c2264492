//! Interactive questions for settings not given on the command line.

use std::io::{self, BufRead, Write};

use listing_mirror::config::{CrawlConfigBuilder, DEFAULT_CONCURRENCY, DownloadMode, split_list};

/// Which settings are already known and must not be asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct Supplied {
    pub base_path: bool,
    pub url: bool,
    pub mode: bool,
    pub ignored_types: bool,
    pub concurrency: bool,
}

/// Answers collected from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    pub base_path: Option<String>,
    pub url: Option<String>,
    pub mode: Option<DownloadMode>,
    pub ignored_types: Vec<String>,
    pub concurrency: Option<usize>,
}

impl Answers {
    /// Applies the non-empty answers on top of `builder`.
    #[must_use]
    pub fn apply(self, mut builder: CrawlConfigBuilder) -> CrawlConfigBuilder {
        if let Some(base_path) = self.base_path {
            builder = builder.base_path(base_path);
        }
        if let Some(url) = self.url {
            builder = builder.root_url(url);
        }
        if let Some(mode) = self.mode {
            builder = builder.mode(mode);
        }
        if !self.ignored_types.is_empty() {
            builder = builder.ignored_types(self.ignored_types);
        }
        if let Some(concurrency) = self.concurrency {
            builder = builder.max_concurrency(concurrency);
        }
        builder
    }
}

/// Asks questions on `output` and reads one line per answer from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks, in order, for the mirror folder, the URL, the download mode
    /// (with its folder list), ignored file types, and concurrency,
    /// skipping whatever `supplied` marks as known.
    pub fn ask(&mut self, supplied: Supplied) -> io::Result<Answers> {
        let mut answers = Answers::default();

        if !supplied.base_path {
            answers.base_path = self.question("Enter the path to save files:")?;
        }
        if !supplied.url {
            answers.url = self.question("(Optional) Enter the URL to download from:")?;
        }
        if !supplied.mode {
            answers.mode = self.ask_mode()?;
        }
        if !supplied.ignored_types {
            answers.ignored_types = self
                .question("(Optional) Inform the ignored file extensions (separated by comma):")?
                .map(|text| split_list(&text))
                .unwrap_or_default();
        }
        if !supplied.concurrency {
            let prompt =
                format!("(Optional) Max concurrent downloads (Default {DEFAULT_CONCURRENCY}):");
            answers.concurrency = self
                .question(&prompt)?
                .and_then(|text| text.parse::<usize>().ok())
                .filter(|value| *value > 0);
        }

        Ok(answers)
    }

    fn ask_mode(&mut self) -> io::Result<Option<DownloadMode>> {
        writeln!(self.output, "Choose a download mode:")?;
        writeln!(self.output, "1. Download All (Default)")?;
        writeln!(self.output, "2. Enter ignored folders")?;
        writeln!(self.output, "3. Download specific folder")?;
        let choice = self.read_line()?;

        let mode = match choice.as_deref() {
            Some("2") => self
                .question("(Optional) Inform the ignored directories (separated by comma):")?
                .map(|text| DownloadMode::Exclude(split_list(&text))),
            Some("3") => self
                .question("(Optional) Inform the only directories to download (separated by comma):")?
                .map(|text| DownloadMode::OnlyInclude(split_list(&text))),
            _ => None,
        };
        Ok(mode)
    }

    /// Prints `prompt` and returns the trimmed answer, `None` when blank.
    fn question(&mut self, prompt: &str) -> io::Result<Option<String>> {
        writeln!(self.output, "{prompt}")?;
        self.read_line()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let line = line.trim();
        Ok((!line.is_empty()).then(|| line.to_string()))
    }
}
