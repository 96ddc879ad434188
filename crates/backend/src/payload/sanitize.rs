//! Stripping of local directory prefixes from submitted paths.

use std::{
    collections::BTreeSet,
    env,
    path::{Path, PathBuf},
};

use solnorm_utils::path::{absolutize, common_prefix, has_named_component, to_slash_string};

use super::AnalysisPayload;
use crate::utils::ast::rewrite_absolute_path;

/// Makes every path in `payload` relative to the directory prefix shared by all of them,
/// resolving relative paths against the current working directory.
pub fn sanitize_paths(payload: &mut AnalysisPayload) -> Option<PathBuf> {
    match env::current_dir() {
        Ok(cwd) => sanitize_paths_with_cwd(payload, &cwd),
        Err(err) => {
            warn!(%err, "cannot determine working directory, paths are left as they are");
            None
        }
    }
}

/// Like [`sanitize_paths`], with an explicit working directory.
///
/// The prefix is the common directory of all referenced files, or, when only one file is
/// referenced, of that file and `cwd`. Rewritten are the source lists, main sources, source
/// keys and the `absolutePath` of every AST. When the paths share nothing but the
/// filesystem root the payload is left untouched. Returns the stripped prefix.
pub fn sanitize_paths_with_cwd(payload: &mut AnalysisPayload, cwd: &Path) -> Option<PathBuf> {
    let files: BTreeSet<PathBuf> = payload
        .contracts
        .iter()
        .flat_map(|c| c.source_list.iter().chain(std::iter::once(&c.main_source)))
        .chain(payload.sources.keys())
        .filter(|p| !p.is_empty())
        .map(|p| absolutize(p, cwd))
        .collect();
    if files.is_empty() {
        debug!("payload references no files, skipping sanitization");
        return None;
    }

    let mut files: Vec<PathBuf> = files.into_iter().collect();
    if files.len() == 1 {
        trace!("single file referenced, trimming by working directory");
        files.push(cwd.to_path_buf());
    }
    let Some(prefix) = common_prefix(&files).filter(|p| has_named_component(p)) else {
        debug!("referenced files share no common directory, skipping sanitization");
        return None;
    };
    debug!(?prefix, "trimming common prefix");

    let strip = |path: &str| -> Option<String> {
        let relative = absolutize(path, cwd).strip_prefix(&prefix).ok()?.to_path_buf();
        let relative = to_slash_string(&relative);
        (!relative.is_empty()).then_some(relative)
    };
    let rewrite = |path: &mut String| {
        if let Some(relative) = strip(path.as_str()) {
            *path = relative;
        }
    };

    for contract in &mut payload.contracts {
        contract.source_list.iter_mut().filter(|p| !p.is_empty()).for_each(rewrite);
        rewrite(&mut contract.main_source);
    }

    payload.sources = std::mem::take(&mut payload.sources)
        .into_iter()
        .map(|(mut path, mut record)| {
            rewrite(&mut path);
            record.path.clone_from(&path);
            rewrite_absolute_path(&mut record.ast, strip);
            if let Some(legacy) = &mut record.legacy_ast {
                rewrite_absolute_path(legacy, strip);
            }
            (path, record)
        })
        .collect();

    Some(prefix)
}
