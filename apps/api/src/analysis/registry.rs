use crate::models::request::{AnalysisDepth, ServiceTier};
use crate::modules::ModuleId;

/// Cost class of a module; depth decides which classes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleClass {
    Core,
    Extended,
    Deep,
}

impl AnalysisDepth {
    pub fn admits(&self, class: ModuleClass) -> bool {
        match self {
            AnalysisDepth::Basic => class == ModuleClass::Core,
            AnalysisDepth::Standard => class != ModuleClass::Deep,
            AnalysisDepth::Deep => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: ModuleId,
    pub class: ModuleClass,
    /// Lowest tier the module is available on.
    pub min_tier: ServiceTier,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: ModuleId::Compatibility,
        class: ModuleClass::Core,
        min_tier: ServiceTier::Basic,
    },
    CatalogEntry {
        id: ModuleId::WorkStyle,
        class: ModuleClass::Core,
        min_tier: ServiceTier::Basic,
    },
    CatalogEntry {
        id: ModuleId::RetentionRisk,
        class: ModuleClass::Extended,
        min_tier: ServiceTier::Pro,
    },
    CatalogEntry {
        id: ModuleId::MarketAlignment,
        class: ModuleClass::Deep,
        min_tier: ServiceTier::Pro,
    },
    CatalogEntry {
        id: ModuleId::GrowthTrajectory,
        class: ModuleClass::Extended,
        min_tier: ServiceTier::Enterprise,
    },
    CatalogEntry {
        id: ModuleId::FairnessAudit,
        class: ModuleClass::Deep,
        min_tier: ServiceTier::Enterprise,
    },
];

/// Maps (tier, depth) to the ordered module set to execute. Pure, no I/O.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    catalog: Vec<CatalogEntry>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self {
            catalog: CATALOG.to_vec(),
        }
    }
}

impl ModuleRegistry {
    /// Everything the tier offers, in catalog order.
    #[cfg(test)]
    pub fn available(&self, tier: ServiceTier) -> Vec<ModuleId> {
        self.catalog
            .iter()
            .filter(|entry| entry.min_tier <= tier)
            .map(|entry| entry.id)
            .collect()
    }

    pub fn resolve(&self, tier: ServiceTier, depth: AnalysisDepth) -> Vec<ModuleId> {
        self.catalog
            .iter()
            .filter(|entry| entry.min_tier <= tier && depth.admits(entry.class))
            .map(|entry| entry.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIERS: [ServiceTier; 3] = [ServiceTier::Basic, ServiceTier::Pro, ServiceTier::Enterprise];
    const DEPTHS: [AnalysisDepth; 3] = [
        AnalysisDepth::Basic,
        AnalysisDepth::Standard,
        AnalysisDepth::Deep,
    ];

    #[test]
    fn test_tiers_are_strictly_nested() {
        let registry = ModuleRegistry::default();
        let basic = registry.available(ServiceTier::Basic);
        let pro = registry.available(ServiceTier::Pro);
        let enterprise = registry.available(ServiceTier::Enterprise);

        assert!(basic.len() < pro.len() && pro.len() < enterprise.len());
        assert!(basic.iter().all(|m| pro.contains(m)));
        assert!(pro.iter().all(|m| enterprise.contains(m)));
    }

    #[test]
    fn test_basic_depth_keeps_two_core_modules() {
        let registry = ModuleRegistry::default();
        for tier in TIERS {
            assert_eq!(
                registry.resolve(tier, AnalysisDepth::Basic),
                vec![ModuleId::Compatibility, ModuleId::WorkStyle],
                "tier {tier:?}"
            );
        }
    }

    #[test]
    fn test_pro_standard_adds_extended_modules() {
        let registry = ModuleRegistry::default();
        assert_eq!(
            registry.resolve(ServiceTier::Pro, AnalysisDepth::Standard),
            vec![
                ModuleId::Compatibility,
                ModuleId::WorkStyle,
                ModuleId::RetentionRisk
            ]
        );
    }

    #[test]
    fn test_deep_returns_everything_available() {
        let registry = ModuleRegistry::default();
        for tier in TIERS {
            assert_eq!(
                registry.resolve(tier, AnalysisDepth::Deep),
                registry.available(tier)
            );
        }
        assert_eq!(
            registry.resolve(ServiceTier::Enterprise, AnalysisDepth::Deep).len(),
            ModuleId::ALL.len()
        );
    }

    #[test]
    fn test_depth_only_narrows() {
        let registry = ModuleRegistry::default();
        for tier in TIERS {
            let sizes: Vec<usize> = DEPTHS
                .iter()
                .map(|depth| registry.resolve(tier, *depth).len())
                .collect();
            assert!(sizes.windows(2).all(|w| w[0] <= w[1]), "tier {tier:?}: {sizes:?}");
        }
    }
}
