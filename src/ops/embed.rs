//! Embedding pipeline - from upstream facts to a metadata envelope.
//!
//! The upstream parser hands over per-file facts; this op assigns stable
//! ids, resolves the type-usage graph into per-unit dependency sets
//! (cycle-safe, via component grouping), normalizes bodies, and produces
//! the envelope ready to attach to the compiled artifact.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::{bail, Context, Result};

use crate::container;
use crate::core::library::{EmbeddedLibrary, LanguageVersion};
use crate::core::source_unit::{ExternalUnit, ParsedSourceFile, SourceUnit, UnitFacts};
use crate::normalize::normalize;
use crate::resolver::scc::{decompose, SccGraph};
use crate::util::prefix::PrefixCache;
use crate::util::{EmbedConfig, InternedString};

/// Result of one embed operation.
#[derive(Debug)]
pub struct EmbedOutcome {
    /// The assembled envelope.
    pub library: EmbeddedLibrary,
    /// The metadata map to attach to the compiled artifact.
    pub metadata: BTreeMap<String, String>,
}

/// Embed one library's parsed sources.
///
/// `referenced` carries the embeddings of libraries this one compiles
/// against; their units join the type-usage graph as external nodes so
/// cross-library (even mutually cyclic) references resolve into flat
/// dependency id sets.
pub fn embed_library(
    library_name: &str,
    language_version: LanguageVersion,
    mut files: Vec<ParsedSourceFile>,
    referenced: &[EmbeddedLibrary],
    config: &EmbedConfig,
) -> Result<EmbedOutcome> {
    let name = config
        .embedding
        .library_name
        .as_deref()
        .unwrap_or(library_name);

    // Units declaring nothing can never be requested; they stay out of
    // the persisted catalog.
    files.retain(|file| {
        if file.declared_types.is_empty() {
            tracing::debug!("excluding `{}`: no declared types", file.path);
            false
        } else {
            true
        }
    });

    let facts = collect_facts(name, files, referenced, config)?;
    let units = resolve_dependency_sets(facts)?;

    let library = EmbeddedLibrary::new(name, language_version, units);
    let metadata = container::to_metadata(&library, config.embedding.encoding)
        .context("serializing embedded payload")?;

    tracing::info!(
        "embedded {} units for `{}` ({:?} payload)",
        library.units().len(),
        name,
        config.embedding.encoding
    );

    Ok(EmbedOutcome { library, metadata })
}

/// Assign ids and build the combined fact list: own units first (full
/// facts), then every referenced library's units (external facts).
fn collect_facts(
    name: &str,
    files: Vec<ParsedSourceFile>,
    referenced: &[EmbeddedLibrary],
    config: &EmbedConfig,
) -> Result<Vec<UnitFacts>> {
    let mut cache = PrefixCache::new();
    let paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();

    let mut seen_ids: HashSet<InternedString> = HashSet::new();
    let mut facts = Vec::new();

    for file in files {
        let prefix = cache.prefix_for(&paths);
        let fragment = file.path.strip_prefix(&prefix).unwrap_or(&file.path);
        let id = InternedString::new(format!("{}>{}", name, fragment));

        if !seen_ids.insert(id) {
            bail!("duplicate source unit id `{}` while embedding `{}`", id, name);
        }

        let body = strip_attribute_lines(&file.body, &config.embedding.exclude_attributes);
        let body = normalize(&body, config.embedding.minify);

        let unit = SourceUnit::new(id, file.declared_types, file.usings, body)
            .with_used_types(file.used_types)
            .with_unsafe(file.unsafe_flag);
        facts.push(UnitFacts::Full(unit));
    }

    for library in referenced {
        for unit in library.units() {
            if !seen_ids.insert(unit.id()) {
                bail!(
                    "duplicate source unit id `{}` between `{}` and its references",
                    unit.id(),
                    name
                );
            }
            facts.push(UnitFacts::External(ExternalUnit::new(
                unit.id(),
                unit.declared_types().clone(),
            )));
        }
    }

    Ok(facts)
}

/// Turn type-usage edges into per-unit dependency id sets.
///
/// Mutually-referential units land in one component and share the
/// component's merged external set, each member also depending on its
/// co-members. External units contribute edges as targets only; their
/// own dependency sets were fixed when they were embedded.
fn resolve_dependency_sets(facts: Vec<UnitFacts>) -> Result<Vec<SourceUnit>> {
    let ids: Vec<InternedString> = facts.iter().map(|f| f.id()).collect();

    let mut declarers: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, fact) in facts.iter().enumerate() {
        for type_id in fact.declared_types() {
            declarers.entry(type_id.as_str()).or_default().push(index);
        }
    }

    let mut graph = SccGraph::new(facts.len());
    for (index, fact) in facts.iter().enumerate() {
        for type_id in fact.used_types() {
            for &declarer in declarers.get(type_id.as_str()).map(|v| v.as_slice()).unwrap_or(&[]) {
                graph.add_edge(index, declarer);
            }
        }
    }

    let components = decompose(&graph, None).context("grouping type-usage components")?;

    let mut deps_by_node: HashMap<usize, BTreeSet<InternedString>> = HashMap::new();
    for component in &components {
        for &member in &component.members {
            let mut deps: BTreeSet<InternedString> = component
                .members
                .iter()
                .filter(|&&other| other != member)
                .map(|&other| ids[other])
                .collect();
            deps.extend(component.external_deps.iter().map(|&node| ids[node]));
            deps_by_node.insert(member, deps);
        }
    }

    let units = facts
        .into_iter()
        .enumerate()
        .filter_map(|(index, fact)| match fact {
            UnitFacts::Full(unit) => {
                let deps = deps_by_node.remove(&index).unwrap_or_default();
                Some(unit.with_dependencies(deps))
            }
            UnitFacts::External(_) => None,
        })
        .collect();

    Ok(units)
}

/// Drop whole attribute lines named by the config, before normalization.
fn strip_attribute_lines(body: &str, names: &[String]) -> String {
    if names.is_empty() {
        return body.to_string();
    }

    body.lines()
        .filter(|line| {
            let trimmed = line.trim();
            let is_excluded = trimmed.starts_with('[')
                && trimmed.ends_with(']')
                && names.iter().any(|name| trimmed.contains(name.as_str()));
            !is_excluded
        })
        .collect::<Vec<_>>()
        .join("\n")
}
