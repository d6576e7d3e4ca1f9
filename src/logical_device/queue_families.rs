use anyhow::Result;
use ash::vk::{QueueFamilyProperties, QueueFlags, SharingMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// family capable of running graphics related commands
    pub graphics: Option<u32>,
    pub compute: Option<u32>,
    /// family used for staging copies
    pub transfer: Option<u32>,
    /// family capable of displaying results on the screen
    pub present: Option<u32>,
}

/// The resolved indices of a suitable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedQueueFamilies {
    pub graphics: u32,
    pub compute: u32,
    pub transfer: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Assigns every role by capability bits, so a single family may fill several roles.
    /// Compute and transfer prefer families dedicated to them, present prefers the graphics
    /// family.
    pub fn resolve(
        families: &[QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> Result<bool>,
    ) -> Result<Self> {
        let usable = |index: &usize| families[*index].queue_count > 0;
        let find = |wanted: QueueFlags, unwanted: QueueFlags| {
            (0..families.len())
                .filter(usable)
                .find(|&index| {
                    let flags = families[index].queue_flags;
                    flags.contains(wanted) && !flags.intersects(unwanted)
                })
                .map(|index| index as u32)
        };

        let graphics = find(QueueFlags::GRAPHICS, QueueFlags::empty());
        let compute = find(QueueFlags::COMPUTE, QueueFlags::GRAPHICS)
            .or_else(|| find(QueueFlags::COMPUTE, QueueFlags::empty()));
        // graphics and compute families implicitly accept transfer commands
        let transfer = find(QueueFlags::TRANSFER, QueueFlags::GRAPHICS | QueueFlags::COMPUTE)
            .or_else(|| find(QueueFlags::TRANSFER, QueueFlags::empty()))
            .or(compute)
            .or(graphics);

        let graphics_presents = match graphics {
            Some(index) => supports_present(index)?,
            None => false,
        };
        let mut present = graphics.filter(|_| graphics_presents);
        if present.is_none() {
            for index in (0..families.len()).filter(usable) {
                if supports_present(index as u32)? {
                    present = Some(index as u32);
                    break;
                }
            }
        }

        Ok(Self {
            graphics,
            compute,
            transfer,
            present,
        })
    }

    /// True if all queue families are available for this physical device.
    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }

    pub fn complete(&self) -> Option<ResolvedQueueFamilies> {
        Some(ResolvedQueueFamilies {
            graphics: self.graphics?,
            compute: self.compute?,
            transfer: self.transfer?,
            present: self.present?,
        })
    }
}

impl ResolvedQueueFamilies {
    /// Distinct family indices in role order, one queue gets created per entry
    pub fn unique(&self) -> Vec<u32> {
        let mut unique = Vec::with_capacity(4);
        for index in [self.graphics, self.compute, self.transfer, self.present] {
            if !unique.contains(&index) {
                unique.push(index);
            }
        }
        unique
    }
}

/// How a resource is shared between the queue families that touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingConfig {
    pub mode: SharingMode,
    /// Empty for exclusive sharing
    pub queue_family_indices: Vec<u32>,
}

impl SharingConfig {
    pub fn exclusive() -> Self {
        Self {
            mode: SharingMode::EXCLUSIVE,
            queue_family_indices: vec![],
        }
    }

    pub fn between(families: &[u32]) -> Self {
        let mut unique = Vec::with_capacity(families.len());
        for index in families {
            if !unique.contains(index) {
                unique.push(*index);
            }
        }
        if unique.len() > 1 {
            Self {
                mode: SharingMode::CONCURRENT,
                queue_family_indices: unique,
            }
        } else {
            Self::exclusive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(queue_flags: QueueFlags) -> QueueFamilyProperties {
        QueueFamilyProperties {
            queue_flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_family_fills_every_role() {
        let families = [family(
            QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
        )];
        let indices = QueueFamilyIndices::resolve(&families, |_| Ok(true)).unwrap();
        assert_eq!(
            indices.complete(),
            Some(ResolvedQueueFamilies {
                graphics: 0,
                compute: 0,
                transfer: 0,
                present: 0,
            })
        );
        assert_eq!(indices.complete().unwrap().unique(), vec![0]);
    }

    #[test]
    fn test_dedicated_families_are_preferred() {
        let families = [
            family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER),
            family(QueueFlags::COMPUTE | QueueFlags::TRANSFER),
            family(QueueFlags::TRANSFER),
        ];
        let indices = QueueFamilyIndices::resolve(&families, |_| Ok(true)).unwrap();
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.compute, Some(1));
        assert_eq!(indices.transfer, Some(2));
        assert_eq!(indices.present, Some(0));
        assert_eq!(indices.complete().unwrap().unique(), vec![0, 1, 2]);
    }

    #[test]
    fn test_transfer_falls_back_to_implicit_support() {
        // graphics families accept transfer commands even without the bit
        let families = [family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE)];
        let indices = QueueFamilyIndices::resolve(&families, |_| Ok(true)).unwrap();
        assert_eq!(indices.transfer, Some(0));
    }

    #[test]
    fn test_present_prefers_graphics_family() {
        let families = [
            family(QueueFlags::COMPUTE),
            family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE),
        ];
        let indices = QueueFamilyIndices::resolve(&families, |_| Ok(true)).unwrap();
        assert_eq!(indices.present, Some(1));

        let indices = QueueFamilyIndices::resolve(&families, |index| Ok(index == 0)).unwrap();
        assert_eq!(indices.present, Some(0));
    }

    #[test]
    fn test_missing_present_is_incomplete() {
        let families = [family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE)];
        let indices = QueueFamilyIndices::resolve(&families, |_| Ok(false)).unwrap();
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_empty_families_are_skipped() {
        let families = [
            QueueFamilyProperties {
                queue_flags: QueueFlags::GRAPHICS,
                queue_count: 0,
                ..Default::default()
            },
            family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE),
        ];
        let indices = QueueFamilyIndices::resolve(&families, |_| Ok(true)).unwrap();
        assert_eq!(indices.graphics, Some(1));
    }

    #[test]
    fn test_sharing_concurrent_for_distinct_families() {
        let sharing = SharingConfig::between(&[0, 2]);
        assert_eq!(sharing.mode, SharingMode::CONCURRENT);
        assert_eq!(sharing.queue_family_indices, vec![0, 2]);
    }

    #[test]
    fn test_sharing_exclusive_for_same_family() {
        let sharing = SharingConfig::between(&[1, 1]);
        assert_eq!(sharing.mode, SharingMode::EXCLUSIVE);
        assert!(sharing.queue_family_indices.is_empty());
    }
}
