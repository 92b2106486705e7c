use serde::{Deserialize, Serialize};

/// The 18-bit permission matrix. Every `Role` carries one of these; a
/// `User.is_system_admin` bypasses the matrix entirely (all true).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Capabilities {
    pub view_planning: bool,
    pub edit_planning: bool,
    pub view_drivers: bool,
    pub manage_drivers: bool,
    pub edit_driver_planning: bool,
    pub manage_rights: bool,
    pub manage_voyages: bool,
    pub generate_planning: bool,
    pub edit_past_planning: bool,
    pub edit_past_planning_advanced: bool,
    pub view_finance: bool,
    pub manage_finance: bool,
    pub view_analyse: bool,
    pub view_sauron: bool,
    pub send_announcements: bool,
    pub manage_announcements_config: bool,
    pub admin_access: bool,
}

impl Capabilities {
    /// All capabilities set — what an `is_system_admin` user effectively has
    /// regardless of its assigned role.
    pub const fn all() -> Self {
        Self {
            view_planning: true,
            edit_planning: true,
            view_drivers: true,
            manage_drivers: true,
            edit_driver_planning: true,
            manage_rights: true,
            manage_voyages: true,
            generate_planning: true,
            edit_past_planning: true,
            edit_past_planning_advanced: true,
            view_finance: true,
            manage_finance: true,
            view_analyse: true,
            view_sauron: true,
            send_announcements: true,
            manage_announcements_config: true,
            admin_access: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Look up a single capability by its route-declared name (used by the
    /// request pipeline's authorize step).
    pub fn get(&self, name: Capability) -> bool {
        match name {
            Capability::ViewPlanning => self.view_planning,
            Capability::EditPlanning => self.edit_planning,
            Capability::ViewDrivers => self.view_drivers,
            Capability::ManageDrivers => self.manage_drivers,
            Capability::EditDriverPlanning => self.edit_driver_planning,
            Capability::ManageRights => self.manage_rights,
            Capability::ManageVoyages => self.manage_voyages,
            Capability::GeneratePlanning => self.generate_planning,
            Capability::EditPastPlanning => self.edit_past_planning,
            Capability::EditPastPlanningAdvanced => self.edit_past_planning_advanced,
            Capability::ViewFinance => self.view_finance,
            Capability::ManageFinance => self.manage_finance,
            Capability::ViewAnalyse => self.view_analyse,
            Capability::ViewSauron => self.view_sauron,
            Capability::SendAnnouncements => self.send_announcements,
            Capability::ManageAnnouncementsConfig => self.manage_announcements_config,
            Capability::AdminAccess => self.admin_access,
        }
    }
}

/// A single named capability, as declared on a route handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewPlanning,
    EditPlanning,
    ViewDrivers,
    ManageDrivers,
    EditDriverPlanning,
    ManageRights,
    ManageVoyages,
    GeneratePlanning,
    EditPastPlanning,
    EditPastPlanningAdvanced,
    ViewFinance,
    ManageFinance,
    ViewAnalyse,
    ViewSauron,
    SendAnnouncements,
    ManageAnnouncementsConfig,
    AdminAccess,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::ViewPlanning => "view_planning",
            Capability::EditPlanning => "edit_planning",
            Capability::ViewDrivers => "view_drivers",
            Capability::ManageDrivers => "manage_drivers",
            Capability::EditDriverPlanning => "edit_driver_planning",
            Capability::ManageRights => "manage_rights",
            Capability::ManageVoyages => "manage_voyages",
            Capability::GeneratePlanning => "generate_planning",
            Capability::EditPastPlanning => "edit_past_planning",
            Capability::EditPastPlanningAdvanced => "edit_past_planning_advanced",
            Capability::ViewFinance => "view_finance",
            Capability::ManageFinance => "manage_finance",
            Capability::ViewAnalyse => "view_analyse",
            Capability::ViewSauron => "view_sauron",
            Capability::SendAnnouncements => "send_announcements",
            Capability::ManageAnnouncementsConfig => "manage_announcements_config",
            Capability::AdminAccess => "admin_access",
        }
    }
}

/// The closed set of seed role names created on first start.
pub const SEED_ROLE_NAMES: [&str; 7] = [
    "viewer",
    "planner",
    "planner_advanced",
    "driver_admin",
    "finance",
    "analyse",
    "admin",
];

/// The bit-exact seed capability vector for a named seed role.
///
/// Matrix (additive over `viewer`, per the external contract):
/// - viewer: view_planning, view_drivers
/// - planner: + edit_planning, manage_voyages, send_announcements
/// - planner_advanced: + edit_past_planning*, view_finance, manage_announcements_config
/// - driver_admin: + manage_drivers, edit_driver_planning
/// - finance: + view_finance, manage_finance
/// - analyse: + view_drivers, view_finance, view_analyse
/// - admin: all
pub fn seed_capabilities(role_name: &str) -> Capabilities {
    let mut c = Capabilities::none();
    c.view_planning = true;
    c.view_drivers = true;

    match role_name {
        "viewer" => {}
        "planner" => {
            c.edit_planning = true;
            c.manage_voyages = true;
            c.send_announcements = true;
        }
        "planner_advanced" => {
            c.edit_planning = true;
            c.manage_voyages = true;
            c.send_announcements = true;
            c.edit_past_planning = true;
            c.edit_past_planning_advanced = true;
            c.view_finance = true;
            c.manage_announcements_config = true;
        }
        "driver_admin" => {
            c.manage_drivers = true;
            c.edit_driver_planning = true;
        }
        "finance" => {
            c.view_finance = true;
            c.manage_finance = true;
        }
        "analyse" => {
            c.view_finance = true;
            c.view_analyse = true;
        }
        "admin" => {
            c = Capabilities::all();
        }
        _ => {}
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_is_minimal() {
        let c = seed_capabilities("viewer");
        assert!(c.view_planning);
        assert!(c.view_drivers);
        assert!(!c.edit_planning);
        assert!(!c.admin_access);
    }

    #[test]
    fn planner_adds_edit_and_voyages() {
        let c = seed_capabilities("planner");
        assert!(c.edit_planning);
        assert!(c.manage_voyages);
        assert!(c.send_announcements);
        assert!(!c.view_finance);
    }

    #[test]
    fn admin_has_every_bit() {
        let c = seed_capabilities("admin");
        assert_eq!(c, Capabilities::all());
    }

    #[test]
    fn unknown_role_name_is_viewer_equivalent() {
        let c = seed_capabilities("bogus");
        assert!(c.view_planning);
        assert!(!c.edit_planning);
    }

    #[test]
    fn all_seed_roles_are_covered() {
        for name in SEED_ROLE_NAMES {
            let _ = seed_capabilities(name);
        }
    }
}
