use clap::Parser;
use error_chain::ChainedError;
use std::path::{Path,PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug,error,info,warn};
use crate::canonical::{canonicalize,dump};
use crate::differ::{diff,DiffStyle,DEFAULT_CONTEXT};
use crate::error::{Error,ErrorKind,Result};
use crate::filter::PathFilter;
use crate::lint::{LintOutcome,Validator,DEFAULT_TIMEOUT};
use crate::loader::{check_file,load,Format};


/* Command line options */
#[derive(Parser)]
#[clap(name="configdiff",version,about="Compares a configuration file against a known good baseline")]
pub struct Opts {
    #[clap(help="Path to the current configuration file")]
    current: String,
    #[clap(help="Path to the baseline configuration file")]
    baseline: String,
    #[clap(short('o'),long="output_format",alias="output-format",default_value="diff",help="Output format, diff or json")]
    output_format: String,
    #[clap(short('U'),long,default_value="3",help="Lines of context around each change in diff output")]
    context: usize,
    #[clap(short('x'),long,multiple_occurrences(true),help="Exclude document paths matching regex")]
    exclude: Vec<String>,
    #[clap(long,help="Produce coloured diff output")]
    colour: bool,
    #[clap(long,help="Don't run yamllint/jsonlint on the inputs")]
    no_lint: bool,
    #[clap(long,default_value="30",help="Seconds to wait for a linter before giving up")]
    lint_timeout: u64,
    #[clap(short,long,parse(from_occurrences),help="Log more detail (repeat for trace output)")]
    pub verbose: u64
}

impl Opts {
    #[allow(dead_code)]
    pub fn new(current: &str, baseline: &str) -> Opts {
        Opts {
            current: current.to_string(),
            baseline: baseline.to_string(),
            output_format: "diff".to_string(),
            context: DEFAULT_CONTEXT,
            exclude: vec![],
            colour: false,
            no_lint: false,
            lint_timeout: DEFAULT_TIMEOUT.as_secs(),
            verbose: 0
        }
    }

    pub fn request(&self) -> Result<ComparisonRequest> {
        let options = CompareOptions {
            style: DiffStyle{context: self.context, colour: self.colour},
            exclude: self.exclude.clone(),
            lint: !self.no_lint,
            lint_timeout: Duration::from_secs(self.lint_timeout)
        };
        Ok(ComparisonRequest::new(&self.current,&self.baseline,&self.output_format)?.with_options(options))
    }
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum OutputFormat {
    Diff,
    Json
}

impl FromStr for OutputFormat {
    type Err = Error;
    fn from_str(name: &str) -> Result<OutputFormat> {
        match name {
            "diff" => Ok(OutputFormat::Diff),
            "json" => Ok(OutputFormat::Json),
            other  => Err(ErrorKind::UnsupportedOutputFormat(other.to_string()).into())
        }
    }
}

#[derive(Clone,Debug)]
pub struct CompareOptions {
    pub style: DiffStyle,
    pub exclude: Vec<String>,
    pub lint: bool,
    pub lint_timeout: Duration
}

impl Default for CompareOptions {
    fn default() -> CompareOptions {
        CompareOptions {
            style: DiffStyle::default(),
            exclude: vec![],
            lint: true,
            lint_timeout: DEFAULT_TIMEOUT
        }
    }
}

/** What to compare and how to report it */
#[derive(Clone,Debug)]
pub struct ComparisonRequest {
    current: PathBuf,
    baseline: PathBuf,
    output: OutputFormat,
    options: CompareOptions
}

impl ComparisonRequest {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(current: P, baseline: Q, output_format: &str) -> Result<ComparisonRequest> {
        Ok(ComparisonRequest {
            current: current.into(),
            baseline: baseline.into(),
            output: output_format.parse()?,
            options: CompareOptions::default()
        })
    }

    pub fn with_options(mut self, options: CompareOptions) -> ComparisonRequest {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }
}

#[derive(PartialEq,Clone,Debug)]
pub enum ComparisonResult {
    Diff(String),
    Json(String),
    NoDifferences
}

fn lint_file(path: &Path, validator: &dyn Validator) -> Result<()> {
    let format = match Format::detect(path) {
        Some(format) => format,
        None => {
            debug!(file = %path.display(), "format not known from extension, not linting");
            return Ok(())
        }
    };
    match validator.validate(path,format) {
        LintOutcome::Passed => {
            debug!(file = %path.display(), "{} lint passed",format);
            Ok(())
        },
        LintOutcome::Unavailable{linter} => {
            warn!("{} not found. Skipping linting of {}. Ensure {} is installed and in your PATH.",linter,path.display(),linter);
            Ok(())
        },
        LintOutcome::Failed{linter,detail} => {
            Err(ErrorKind::Lint(path.display().to_string(),linter,detail).into())
        }
    }
}

/**
 * Check, lint and load both files, then compare their canonical forms.
 * The diff runs from the baseline to the current file.
 */
pub fn compare(request: &ComparisonRequest, validator: &dyn Validator) -> Result<ComparisonResult> {
    let options = &request.options;
    check_file(&request.current)?;
    check_file(&request.baseline)?;
    if options.lint {
        lint_file(&request.current,validator)?;
        lint_file(&request.baseline,validator)?;
    } else {
        debug!("linting disabled");
    }
    let filter = PathFilter::new(&options.exclude)?;
    let mut current = load(&request.current)?;
    let mut baseline = load(&request.baseline)?;
    filter.prune(&mut current);
    filter.prune(&mut baseline);
    let result = match request.output {
        OutputFormat::Diff => {
            let baseline_text = canonicalize(&baseline)?;
            let current_text = canonicalize(&current)?;
            let baseline_label = request.baseline.display().to_string();
            let current_label = request.current.display().to_string();
            match diff(&baseline_text,&current_text,&baseline_label,&current_label,options.style) {
                Some(text) => ComparisonResult::Diff(text),
                None       => ComparisonResult::NoDifferences
            }
        },
        OutputFormat::Json => ComparisonResult::Json(dump(&current,&baseline)?)
    };
    Ok(result)
}

/** Tell the operator what went wrong; the cause chain goes to the log */
pub fn report_error(e: &Error) {
    error!("{}",e.display_chain().to_string().trim_end());
    match e.kind() {
        ErrorKind::NotFound(..) | ErrorKind::Format(..) | ErrorKind::Lint(..)
            | ErrorKind::UnsupportedOutputFormat(..) | ErrorKind::Regex(..) => eprintln!("Error: {}",e),
        _ => eprintln!("An unexpected error occurred: {}",e)
    }
}

/**
 * Run a comparison, converting any failure into an error report and
 * "no result".
 */
pub fn run_comparison(request: &ComparisonRequest, validator: &dyn Validator) -> Option<ComparisonResult> {
    info!(current = %request.current.display(), baseline = %request.baseline.display(), "comparing configurations");
    match compare(request,validator) {
        Ok(result) => Some(result),
        Err(e) => {
            report_error(&e);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::fs;

    /** Validator that always answers the same and records what it saw */
    struct FakeValidator {
        outcome: LintOutcome,
        seen: RefCell<Vec<(PathBuf,Format)>>
    }

    impl FakeValidator {
        fn new(outcome: LintOutcome) -> FakeValidator {
            FakeValidator{outcome, seen: RefCell::new(vec![])}
        }
        fn passing() -> FakeValidator {
            FakeValidator::new(LintOutcome::Passed)
        }
        fn unavailable() -> FakeValidator {
            FakeValidator::new(LintOutcome::Unavailable{linter: "yamllint".to_string()})
        }
    }

    impl Validator for FakeValidator {
        fn validate(&self, path: &Path, format: Format) -> LintOutcome {
            self.seen.borrow_mut().push((path.to_path_buf(),format));
            self.outcome.clone()
        }
    }

    fn fixture(filename: &str) -> PathBuf {
        Path::new("test-fixtures").join(filename)
    }

    fn request(current: &str, baseline: &str, output: &str) -> ComparisonRequest {
        ComparisonRequest::new(fixture(current),fixture(baseline),output).unwrap()
    }

    #[test]
    fn test_reordered_keys_have_no_differences() {
        let validator = FakeValidator::passing();
        let result = compare(&request("service-reordered.yaml","service.json","diff"),&validator).unwrap();
        assert_eq!(ComparisonResult::NoDifferences,result);
        let seen = validator.seen.borrow();
        assert_eq!(vec![(fixture("service-reordered.yaml"),Format::Yaml),(fixture("service.json"),Format::Json)],*seen);
    }

    #[test]
    fn test_single_added_entry() {
        let result = compare(&request("simple-current.yaml","simple-baseline.yaml","diff"),&FakeValidator::passing()).unwrap();
        match result {
            ComparisonResult::Diff(text) => {
                let lines: Vec<&str> = text.lines().collect();
                assert_eq!("--- test-fixtures/simple-baseline.yaml",lines[0]);
                assert_eq!("+++ test-fixtures/simple-current.yaml",lines[1]);
                let changes: Vec<&&str> = lines[2..].iter().filter(|l| l.starts_with('+') || l.starts_with('-')).collect();
                assert_eq!(vec![&"+c: 3"],changes);
            },
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_deployment_changes() {
        let result = compare(&request("deployment-modified.yaml","deployment.yaml","diff"),&FakeValidator::passing()).unwrap();
        match result {
            ComparisonResult::Diff(text) => {
                assert!(text.contains("\n-  replicas: 2\n+  replicas: 3\n"));
                assert!(text.contains("\n-        - image: nginx:1.25\n+        - image: nginx:1.27\n"));
                assert!(text.contains("\n+    tier: frontend\n"));
            },
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_json_output() {
        let result = compare(&request("x2.json","x1.json","json"),&FakeValidator::passing()).unwrap();
        match result {
            ComparisonResult::Json(text) => {
                let json: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(serde_json::json!({"baseline": {"x": 1}, "current": {"x": 2}}),json);
                assert!(text.find("\"baseline\"").unwrap() < text.find("\"current\"").unwrap());
            },
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_json_output_even_when_equal() {
        let result = compare(&request("x1.json","x1.json","json"),&FakeValidator::passing()).unwrap();
        assert!(matches!(result,ComparisonResult::Json(_)));
    }

    #[test]
    fn test_large_integers_are_compared_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("current.json");
        let baseline = dir.path().join("baseline.yaml");
        fs::write(&current,"{\"id\": 18446744073709551615}").unwrap();
        fs::write(&baseline,"id: 18446744073709551614\n").unwrap();
        let req = ComparisonRequest::new(&current,&baseline,"diff").unwrap();
        match compare(&req,&FakeValidator::passing()).unwrap() {
            ComparisonResult::Diff(text) => {
                assert!(text.contains("\n-id: 18446744073709551614\n+id: 18446744073709551615\n"),"diff was:\n{}",text);
            },
            other => panic!("Unexpected result {:?}",other)
        }
        let req = ComparisonRequest::new(&current,&baseline,"json").unwrap();
        match compare(&req,&FakeValidator::passing()).unwrap() {
            ComparisonResult::Json(text) => {
                assert!(text.contains("\"id\": 18446744073709551614\n"),"dump was:\n{}",text);
                assert!(text.contains("\"id\": 18446744073709551615\n"),"dump was:\n{}",text);
            },
            other => panic!("Unexpected result {:?}",other)
        }
    }

    #[test]
    fn test_unsupported_output_format() {
        let err = ComparisonRequest::new(fixture("x1.json"),fixture("x2.json"),"xml").unwrap_err();
        match err.kind() {
            ErrorKind::UnsupportedOutputFormat(name) => assert_eq!("xml",name),
            other => panic!("Unexpected error {:?}",other)
        }
    }

    #[test]
    fn test_missing_file_before_lint() {
        let validator = FakeValidator::passing();
        let err = compare(&request("x1.json","nope.yaml","diff"),&validator).unwrap_err();
        assert!(matches!(err.kind(),ErrorKind::NotFound(..)));
        assert!(validator.seen.borrow().is_empty());
        assert_eq!(None,run_comparison(&request("nope.yaml","x1.json","diff"),&validator));
    }

    #[test]
    fn test_lint_failure_blocks() {
        let validator = FakeValidator::new(LintOutcome::Failed{linter: "yamllint".to_string(), detail: "1:1 error".to_string()});
        let req = request("simple-current.yaml","simple-baseline.yaml","diff");
        match compare(&req,&validator).unwrap_err().kind() {
            ErrorKind::Lint(path,linter,detail) => {
                assert_eq!("test-fixtures/simple-current.yaml",path);
                assert_eq!("yamllint",linter);
                assert_eq!("1:1 error",detail);
            },
            other => panic!("Unexpected error {:?}",other)
        }
        assert_eq!(None,run_comparison(&req,&validator));
    }

    #[test]
    fn test_missing_linter_does_not_block_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("current.yaml");
        fs::write(&current,"name: web\n  bad: [indent\n").unwrap();
        let req = ComparisonRequest::new(&current,fixture("simple-baseline.yaml"),"diff").unwrap();
        let validator = FakeValidator::unavailable();
        match compare(&req,&validator).unwrap_err().kind() {
            ErrorKind::Format(path,_) => assert!(path.ends_with("current.yaml")),
            other => panic!("Unexpected error {:?}",other)
        }
        assert_eq!(2,validator.seen.borrow().len());
    }

    #[test]
    fn test_unknown_extension_not_linted() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("current.conf");
        fs::write(&current,"{\"x\": 1}").unwrap();
        let req = ComparisonRequest::new(&current,fixture("x1.json"),"diff").unwrap();
        let validator = FakeValidator::passing();
        assert_eq!(ComparisonResult::NoDifferences,compare(&req,&validator).unwrap());
        assert_eq!(vec![(fixture("x1.json"),Format::Json)],*validator.seen.borrow());
    }

    #[test]
    fn test_lint_disabled() {
        let validator = FakeValidator::new(LintOutcome::Failed{linter: "jsonlint".to_string(), detail: String::new()});
        let mut options = CompareOptions::default();
        options.lint = false;
        let req = request("x1.json","x1.json","diff").with_options(options);
        assert_eq!(ComparisonResult::NoDifferences,compare(&req,&validator).unwrap());
        assert!(validator.seen.borrow().is_empty());
    }

    #[test]
    fn test_exclude_paths() {
        let mut options = CompareOptions::default();
        options.exclude = vec![r"^spec\.replicas$".to_string(),r"containers\[0\]\.image$".to_string(),r"^metadata\.labels".to_string()];
        let req = request("deployment-modified.yaml","deployment.yaml","diff").with_options(options);
        assert_eq!(ComparisonResult::NoDifferences,compare(&req,&FakeValidator::passing()).unwrap());
    }

    #[test]
    fn test_bad_exclude_regex() {
        let mut options = CompareOptions::default();
        options.exclude = vec!["[".to_string()];
        let req = request("x1.json","x2.json","diff").with_options(options);
        assert!(matches!(compare(&req,&FakeValidator::passing()).unwrap_err().kind(),ErrorKind::Regex(_)));
    }

    #[test]
    fn test_parse_opts() {
        let opts = Opts::try_parse_from(["configdiff","cur.yaml","base.yaml","-o","json","-x","^a$","-x","b",
                                         "--no-lint","-U","5","--lint-timeout","2","-vv"]).unwrap();
        assert_eq!(2,opts.verbose);
        let req = opts.request().unwrap();
        assert_eq!(OutputFormat::Json,req.output);
        assert_eq!(PathBuf::from("cur.yaml"),req.current);
        assert_eq!(PathBuf::from("base.yaml"),req.baseline);
        assert_eq!(vec!["^a$".to_string(),"b".to_string()],req.options.exclude);
        assert!(!req.options.lint);
        assert_eq!(5,req.options.style.context);
        assert_eq!(Duration::from_secs(2),req.options.lint_timeout);
    }

    #[test]
    fn test_opts_defaults_and_unsupported_format() {
        let opts = Opts::try_parse_from(["configdiff","cur.yaml","base.yaml"]).unwrap();
        let req = opts.request().unwrap();
        assert_eq!(OutputFormat::Diff,req.output);
        assert_eq!(DEFAULT_CONTEXT,req.options.style.context);
        assert!(req.options.lint);
        let opts = Opts::try_parse_from(["configdiff","cur.yaml","base.yaml","--output_format","xml"]).unwrap();
        assert!(opts.request().is_err());
        let mut opts = Opts::new("cur.yaml","base.yaml");
        opts.output_format = "json".to_string();
        assert_eq!(OutputFormat::Json,opts.request().unwrap().output);
    }
}
