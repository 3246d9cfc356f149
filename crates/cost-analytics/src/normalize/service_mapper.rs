//! Provider service name to unified category resolution
//!
//! Resolution order:
//! 1. the client's active custom rules, highest priority first
//! 2. exact match against the provider's base table
//! 3. fuzzy match against base names and aliases (cached per provider/name)
//! 4. `OTHER` with `UNKNOWN` confidence

use super::mapping_tables::base_mappings;
use crate::error::Result;
use crate::models::{
    CloudProvider, ConfidenceLevel, CustomMappingRule, RuleType, ServiceCategory, ServiceMapping,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Minimum similarity for a fuzzy match to be accepted
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.7;
/// Fuzzy matches above this score get MEDIUM confidence, the rest LOW
pub const FUZZY_MEDIUM_CONFIDENCE: f64 = 0.8;

/// Normalized string similarity in [0, 1].
///
/// Case-insensitive equality scores 1.0, containment either way 0.8, anything
/// else `1 - levenshtein / max_len`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let max_len = a.chars().count().max(b.chars().count());
    1.0 - strsim::levenshtein(&a, &b) as f64 / max_len as f64
}

/// Bulk configuration exchange format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingExport {
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub base_mappings: BTreeMap<CloudProvider, Vec<ServiceMapping>>,
    #[serde(default)]
    pub custom_rules: Vec<CustomMappingRule>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub base_mappings_imported: usize,
    pub custom_rules_imported: usize,
}

/// How a stored custom rule tests a service name
enum RuleMatcher {
    Exact(String),
    /// Lowercased pattern
    Contains(String),
    Regex(Regex),
    /// Pattern failed to compile; never matches
    Invalid,
}

/// A custom rule with its pattern prepared once at insert time
struct CompiledRule {
    rule: CustomMappingRule,
    matcher: RuleMatcher,
}

impl CompiledRule {
    fn compile(rule: CustomMappingRule) -> Self {
        let matcher = match rule.rule_type {
            RuleType::Exact => RuleMatcher::Exact(rule.service_pattern.clone()),
            RuleType::Contains => RuleMatcher::Contains(rule.service_pattern.to_lowercase()),
            RuleType::Regex => match RegexBuilder::new(&rule.service_pattern)
                .case_insensitive(true)
                .build()
            {
                Ok(regex) => RuleMatcher::Regex(regex),
                Err(e) => {
                    warn!(
                        "Custom rule {} for client {} will never match: invalid regex '{}': {}",
                        rule.rule_id, rule.client_id, rule.service_pattern, e
                    );
                    RuleMatcher::Invalid
                }
            },
        };
        Self { rule, matcher }
    }

    fn matches(&self, service_name: &str, lowered: &str) -> bool {
        match &self.matcher {
            RuleMatcher::Exact(pattern) => service_name == pattern,
            RuleMatcher::Contains(pattern) => lowered.contains(pattern.as_str()),
            RuleMatcher::Regex(regex) => regex.is_match(service_name),
            RuleMatcher::Invalid => false,
        }
    }
}

pub struct ServiceCategoryMapper {
    base: RwLock<HashMap<CloudProvider, Vec<ServiceMapping>>>,
    /// Rules keyed by client id
    custom_rules: DashMap<String, Vec<CompiledRule>>,
    /// `None` caches a miss so unmapped names are not re-scored
    fuzzy_cache: DashMap<(CloudProvider, String), Option<ServiceMapping>>,
}

impl ServiceCategoryMapper {
    pub fn new() -> Self {
        let base = CloudProvider::ALL
            .into_iter()
            .map(|provider| (provider, base_mappings(provider)))
            .collect();

        Self {
            base: RwLock::new(base),
            custom_rules: DashMap::new(),
            fuzzy_cache: DashMap::new(),
        }
    }

    pub fn map_service(
        &self,
        provider: CloudProvider,
        service_name: &str,
        client_id: Option<&str>,
    ) -> ServiceMapping {
        if let Some(client_id) = client_id {
            if let Some(mapping) = self.match_custom_rules(provider, service_name, client_id) {
                return mapping;
            }
        }

        if let Some(mapping) = self.exact_match(provider, service_name) {
            return mapping;
        }

        let key = (provider, service_name.to_string());
        if let Some(cached) = self.fuzzy_cache.get(&key) {
            return cached
                .clone()
                .unwrap_or_else(|| ServiceMapping::unmapped(service_name));
        }

        let fuzzy = self.fuzzy_match(provider, service_name);
        self.fuzzy_cache.insert(key, fuzzy.clone());

        match fuzzy {
            Some(mapping) => mapping,
            None => {
                debug!("No mapping for {} service '{}', using OTHER", provider, service_name);
                ServiceMapping::unmapped(service_name)
            }
        }
    }

    fn match_custom_rules(
        &self,
        provider: CloudProvider,
        service_name: &str,
        client_id: &str,
    ) -> Option<ServiceMapping> {
        let rules = self.custom_rules.get(client_id)?;

        let mut candidates: Vec<&CompiledRule> = rules
            .iter()
            .filter(|compiled| compiled.rule.is_active && compiled.rule.provider == provider)
            .collect();
        candidates.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));

        let lowered = service_name.to_lowercase();
        let rule = &candidates
            .into_iter()
            .find(|compiled| compiled.matches(service_name, &lowered))?
            .rule;

        debug!(
            "Custom rule {} mapped '{}' to {} for client {}",
            rule.rule_id, service_name, rule.target_category, client_id
        );

        Some(
            ServiceMapping::new(service_name, rule.target_category, ConfidenceLevel::High)
                .with_tags(["custom_rule".to_string(), rule.rule_id.clone()]),
        )
    }

    fn exact_match(&self, provider: CloudProvider, service_name: &str) -> Option<ServiceMapping> {
        self.base
            .read()
            .get(&provider)?
            .iter()
            .find(|m| m.provider_service_name == service_name)
            .cloned()
    }

    /// Best base mapping by similarity against names and aliases
    fn best_candidate(&self, provider: CloudProvider, service_name: &str) -> Option<(ServiceMapping, f64)> {
        let base = self.base.read();
        let mut best: Option<(&ServiceMapping, f64)> = None;

        for mapping in base.get(&provider)? {
            let score = std::iter::once(&mapping.provider_service_name)
                .chain(mapping.aliases.iter())
                .map(|candidate| similarity(service_name, candidate))
                .fold(0.0, f64::max);

            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((mapping, score));
            }
        }

        best.map(|(mapping, score)| (mapping.clone(), score))
    }

    fn fuzzy_match(&self, provider: CloudProvider, service_name: &str) -> Option<ServiceMapping> {
        let (matched, score) = self.best_candidate(provider, service_name)?;
        if score <= FUZZY_MATCH_THRESHOLD {
            return None;
        }

        let confidence = if score > FUZZY_MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };

        debug!(
            "Fuzzy matched {} service '{}' to '{}' (score {:.2})",
            provider, service_name, matched.provider_service_name, score
        );

        let mut tags = matched.tags.clone();
        tags.push("fuzzy_match".to_string());

        Some(
            ServiceMapping::new(service_name, matched.unified_category, confidence)
                .with_aliases(matched.aliases)
                .with_tags(tags),
        )
    }

    /// Ranked fuzzy candidates, best first
    pub fn suggest_mappings(
        &self,
        provider: CloudProvider,
        service_name: &str,
        limit: usize,
    ) -> Vec<(ServiceMapping, f64)> {
        let base = self.base.read();
        let Some(mappings) = base.get(&provider) else {
            return Vec::new();
        };

        let mut scored: Vec<(ServiceMapping, f64)> = mappings
            .iter()
            .map(|mapping| {
                let score = std::iter::once(&mapping.provider_service_name)
                    .chain(mapping.aliases.iter())
                    .map(|candidate| similarity(service_name, candidate))
                    .fold(0.0, f64::max);
                (mapping.clone(), score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by_key(|(_, score)| std::cmp::Reverse(OrderedFloat(*score)));
        scored.truncate(limit);
        scored
    }

    /// Returns the rule id
    pub fn add_custom_rule(&self, rule: CustomMappingRule) -> String {
        let rule_id = rule.rule_id.clone();
        info!(
            "Adding custom mapping rule {} for client {} ({:?} '{}' -> {})",
            rule_id, rule.client_id, rule.rule_type, rule.service_pattern, rule.target_category
        );

        let compiled = CompiledRule::compile(rule);
        let mut rules = self.custom_rules.entry(compiled.rule.client_id.clone()).or_default();
        rules.retain(|existing| existing.rule.rule_id != rule_id);
        rules.push(compiled);
        drop(rules);

        self.fuzzy_cache.clear();
        rule_id
    }

    pub fn remove_custom_rule(&self, client_id: &str, rule_id: &str) -> bool {
        let Some(mut rules) = self.custom_rules.get_mut(client_id) else {
            return false;
        };

        let before = rules.len();
        rules.retain(|compiled| compiled.rule.rule_id != rule_id);
        let removed = rules.len() < before;
        drop(rules);

        if removed {
            self.fuzzy_cache.clear();
            info!("Removed custom mapping rule {} for client {}", rule_id, client_id);
        }
        removed
    }

    pub fn get_custom_rules(&self, client_id: &str) -> Vec<CustomMappingRule> {
        self.custom_rules
            .get(client_id)
            .map(|rules| rules.iter().map(|compiled| compiled.rule.clone()).collect())
            .unwrap_or_default()
    }

    /// Ids of the client's regex rules whose pattern does not compile
    pub fn invalid_rule_ids(&self, client_id: &str) -> Vec<String> {
        self.custom_rules
            .get(client_id)
            .map(|rules| {
                rules
                    .iter()
                    .filter(|compiled| matches!(compiled.matcher, RuleMatcher::Invalid))
                    .map(|compiled| compiled.rule.rule_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn export_mappings(&self) -> MappingExport {
        let base_mappings = self
            .base
            .read()
            .iter()
            .map(|(provider, mappings)| (*provider, mappings.clone()))
            .collect();

        let mut custom_rules: Vec<CustomMappingRule> = self
            .custom_rules
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .map(|compiled| compiled.rule.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        custom_rules.sort_by(|a, b| {
            a.client_id
                .cmp(&b.client_id)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        MappingExport {
            exported_at: Utc::now(),
            base_mappings,
            custom_rules,
        }
    }

    /// Merge an export into this mapper; entries with the same name or rule id are replaced
    pub fn import_mappings(&self, export: MappingExport) -> ImportSummary {
        let mut summary = ImportSummary::default();

        {
            let mut base = self.base.write();
            for (provider, mappings) in export.base_mappings {
                let table = base.entry(provider).or_default();
                for mapping in mappings {
                    table.retain(|m| m.provider_service_name != mapping.provider_service_name);
                    table.push(mapping);
                    summary.base_mappings_imported += 1;
                }
            }
        }

        for rule in export.custom_rules {
            self.add_custom_rule(rule);
            summary.custom_rules_imported += 1;
        }

        self.fuzzy_cache.clear();
        info!(
            "Imported {} base mappings and {} custom rules",
            summary.base_mappings_imported, summary.custom_rules_imported
        );
        summary
    }

    pub fn export_mappings_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_mappings())?)
    }

    pub fn import_mappings_json(&self, json: &str) -> Result<ImportSummary> {
        let export: MappingExport = serde_json::from_str(json)?;
        Ok(self.import_mappings(export))
    }

    /// Number of base mappings per category across all providers
    pub fn category_statistics(&self) -> BTreeMap<ServiceCategory, usize> {
        let mut counts = BTreeMap::new();
        for mappings in self.base.read().values() {
            for mapping in mappings {
                *counts.entry(mapping.unified_category).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn clear_cache(&self) {
        self.fuzzy_cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.fuzzy_cache.len()
    }
}

impl Default for ServiceCategoryMapper {
    fn default() -> Self {
        Self::new()
    }
}
