error_chain!{
    foreign_links {
        Io(std::io::Error);
        Regex(regex::Error);
        Json(serde_json::Error);
    }
    errors {
        NotFound(path: String, reason: &'static str) {
            description("configuration file not found or not a regular file")
            display("{}: {}",reason,path)
        }
        Format(path: String, detail: String) {
            description("configuration file could not be parsed")
            display("Could not load {}: {}",path,detail)
        }
        Lint(path: String, linter: String, detail: String) {
            description("linter reported errors")
            display("{} found errors in {}:\n{}",linter,path,detail)
        }
        UnsupportedOutputFormat(format: String) {
            description("output format is not supported")
            display("Unsupported output format: {} (expected diff or json)",format)
        }
    }
}
