use super::types::KantraRequest;

/// Builds the kantra argv. Every value is a separate element; nothing is shell-quoted.
pub fn build_kantra_args(request: &KantraRequest) -> Vec<String> {
    let opts = &request.options;
    let mut args = vec!["analyze".to_string()];

    for input in &request.inputs {
        args.push("--input".to_string());
        args.push(input.clone());
    }

    args.push("--output".to_string());
    args.push(request.output_dir.to_string_lossy().to_string());

    if opts.overwrite {
        args.push("--overwrite".to_string());
    }
    for source in &opts.sources {
        args.push("--source".to_string());
        args.push(source.clone());
    }
    for target in &opts.targets {
        args.push("--target".to_string());
        args.push(target.clone());
    }
    for rules in &opts.rules {
        args.push("--rules".to_string());
        args.push(rules.clone());
    }
    if opts.analyze_known_libraries {
        args.push("--analyze-known-libraries".to_string());
    }

    for pair in &opts.passthrough {
        args.push(format!("--{}", pair.key));
        if !pair.value.is_empty() {
            args.push(pair.value.clone());
        }
    }
    args
}
