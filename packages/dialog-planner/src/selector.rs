use std::sync::Arc;

use crate::{
	Error, Result,
	strategy::{SearchContext, SearchStrategy},
};

/// Picks the strategy that compiles a request.
pub struct StrategySelector {
	strategies: Vec<Arc<dyn SearchStrategy>>,
	default_index: usize,
	branching_enabled: bool,
}

impl StrategySelector {
	pub fn new(
		strategies: Vec<Arc<dyn SearchStrategy>>,
		default_name: &str,
		branching_enabled: bool,
	) -> Result<Self> {
		for (index, strategy) in strategies.iter().enumerate() {
			if strategies[..index].iter().any(|other| other.name() == strategy.name()) {
				return Err(Error::DuplicateStrategy { name: strategy.name().to_string() });
			}
		}

		let default_index = strategies
			.iter()
			.position(|strategy| strategy.name() == default_name)
			.ok_or_else(|| Error::MissingDefaultStrategy { name: default_name.to_string() })?;

		Ok(Self { strategies, default_index, branching_enabled })
	}

	pub fn default_strategy(&self) -> &dyn SearchStrategy {
		self.strategies[self.default_index].as_ref()
	}

	/// Highest positive score wins and ties go to the alphabetically first name.
	///
	/// With branching disabled, or when nothing scores above zero, the default strategy is used.
	pub fn select(&self, context: &SearchContext<'_>) -> &dyn SearchStrategy {
		if !self.branching_enabled {
			tracing::debug!(
				strategy = self.default_strategy().name(),
				"Strategy branching disabled. Using default strategy."
			);

			return self.default_strategy();
		}

		let mut best: Option<(&dyn SearchStrategy, i32)> = None;

		for strategy in &self.strategies {
			let score = strategy.score(context);

			tracing::trace!(strategy = strategy.name(), score, "Scored search strategy.");

			if score <= 0 {
				continue;
			}

			let better = match best {
				None => true,
				Some((current, current_score)) =>
					score > current_score
						|| (score == current_score && strategy.name() < current.name()),
			};

			if better {
				best = Some((strategy.as_ref(), score));
			}
		}

		match best {
			Some((strategy, score)) => {
				tracing::debug!(
					strategy = strategy.name(),
					score,
					total_services = context.shaped.total_service_count,
					"Selected search strategy."
				);

				strategy
			},
			None => {
				tracing::debug!(
					strategy = self.default_strategy().name(),
					"No strategy scored above zero. Using default strategy."
				);

				self.default_strategy()
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use dialog_domain::{AuthorizationGrant, SearchFilterSet};

	use super::*;
	use crate::{CompiledQuery, PartyDriven, ServiceDriven};

	struct Fixed {
		name: &'static str,
		score: i32,
	}

	impl SearchStrategy for Fixed {
		fn name(&self) -> &'static str {
			self.name
		}

		fn score(&self, _context: &SearchContext<'_>) -> i32 {
			self.score
		}

		fn compile(&self, _context: &SearchContext<'_>) -> CompiledQuery {
			CompiledQuery { sql: String::new(), params: Vec::new(), strategy: self.name }
		}
	}

	fn fixed(name: &'static str, score: i32) -> Arc<dyn SearchStrategy> {
		Arc::new(Fixed { name, score })
	}

	fn pick(selector: &StrategySelector) -> &'static str {
		let filters = SearchFilterSet::default();
		let grant = AuthorizationGrant::default();

		selector.select(&SearchContext::new(&filters, &grant)).name()
	}

	#[test]
	fn missing_default_is_a_construction_error() {
		let err = StrategySelector::new(vec![fixed("Only", 1)], "Absent", true)
			.err()
			.expect("Expected missing default error.");

		assert!(matches!(err, Error::MissingDefaultStrategy { ref name } if name == "Absent"));
	}

	#[test]
	fn duplicate_names_are_rejected() {
		let result = StrategySelector::new(vec![fixed("A", 1), fixed("A", 2)], "A", true);

		assert!(matches!(result, Err(Error::DuplicateStrategy { .. })));
	}

	#[test]
	fn disabled_branching_skips_scoring() {
		let selector =
			StrategySelector::new(vec![fixed("Default", 1), fixed("Better", 50)], "Default", false)
				.expect("Failed to build selector.");

		assert_eq!(pick(&selector), "Default");
	}

	#[test]
	fn ties_go_to_the_first_name() {
		let selector = StrategySelector::new(
			vec![fixed("Default", 1), fixed("Zeta", 10), fixed("Alpha", 10)],
			"Default",
			true,
		)
		.expect("Failed to build selector.");

		assert_eq!(pick(&selector), "Alpha");
	}

	#[test]
	fn non_positive_scores_fall_back_to_default() {
		let selector =
			StrategySelector::new(vec![fixed("Default", 0), fixed("Other", -3)], "Default", true)
				.expect("Failed to build selector.");

		assert_eq!(pick(&selector), "Default");
	}

	#[test]
	fn grant_shape_decides_between_built_in_strategies() {
		let selector = StrategySelector::new(
			vec![Arc::new(PartyDriven::new(5)) as Arc<dyn SearchStrategy>, Arc::new(ServiceDriven)],
			crate::strategy::party_driven::NAME,
			true,
		)
		.expect("Failed to build selector.");
		let filters = SearchFilterSet::default();
		let narrow = AuthorizationGrant::default().with_party("a", ["x"]).with_party("b", ["x"]);
		let wide = AuthorizationGrant::default()
			.with_party("a", (1..=10).map(|index| format!("svc-{index}")));

		assert_eq!(selector.select(&SearchContext::new(&filters, &narrow)).name(), "PartyDriven");
		assert_eq!(selector.select(&SearchContext::new(&filters, &wide)).name(), "ServiceDriven");
	}
}
