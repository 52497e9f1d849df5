//! Permission groups and default handler tables

/// Runtime permission names
pub mod permission {
    #![allow(missing_docs)]

    pub const READ_PHONE_STATE: &str = "android.permission.READ_PHONE_STATE";
    pub const CALL_PHONE: &str = "android.permission.CALL_PHONE";
    pub const READ_CALL_LOG: &str = "android.permission.READ_CALL_LOG";
    pub const WRITE_CALL_LOG: &str = "android.permission.WRITE_CALL_LOG";
    pub const ADD_VOICEMAIL: &str = "com.android.voicemail.permission.ADD_VOICEMAIL";
    pub const USE_SIP: &str = "android.permission.USE_SIP";
    pub const PROCESS_OUTGOING_CALLS: &str = "android.permission.PROCESS_OUTGOING_CALLS";
    pub const READ_CONTACTS: &str = "android.permission.READ_CONTACTS";
    pub const WRITE_CONTACTS: &str = "android.permission.WRITE_CONTACTS";
    pub const ACCESS_FINE_LOCATION: &str = "android.permission.ACCESS_FINE_LOCATION";
    pub const ACCESS_COARSE_LOCATION: &str = "android.permission.ACCESS_COARSE_LOCATION";
    pub const READ_CALENDAR: &str = "android.permission.READ_CALENDAR";
    pub const WRITE_CALENDAR: &str = "android.permission.WRITE_CALENDAR";
    pub const SEND_SMS: &str = "android.permission.SEND_SMS";
    pub const RECEIVE_SMS: &str = "android.permission.RECEIVE_SMS";
    pub const READ_SMS: &str = "android.permission.READ_SMS";
    pub const RECEIVE_WAP_PUSH: &str = "android.permission.RECEIVE_WAP_PUSH";
    pub const RECEIVE_MMS: &str = "android.permission.RECEIVE_MMS";
    pub const READ_CELL_BROADCASTS: &str = "android.permission.READ_CELL_BROADCASTS";
    pub const RECORD_AUDIO: &str = "android.permission.RECORD_AUDIO";
    pub const CAMERA: &str = "android.permission.CAMERA";
    pub const BODY_SENSORS: &str = "android.permission.BODY_SENSORS";
    pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
    pub const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";
    pub const WRITE_SETTINGS: &str = "android.permission.WRITE_SETTINGS";
    pub const GRANT_REVOKE_PERMISSIONS: &str = "android.permission.GRANT_REVOKE_PERMISSIONS";
    pub const INTERACT_ACROSS_USERS_FULL: &str = "android.permission.INTERACT_ACROSS_USERS_FULL";
    pub const CLEAR_APP_USER_DATA: &str = "android.permission.CLEAR_APP_USER_DATA";
    pub const KILL_UID: &str = "android.permission.KILL_UID";
}

use permission::*;

/// A fixed set of permissions granted together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PermissionGroup {
    /// Telephony and call log
    Phone,
    /// Contacts provider
    Contacts,
    /// Fine and coarse location
    Location,
    /// Calendar provider
    Calendar,
    /// SMS, MMS and cell broadcasts
    Sms,
    /// Audio recording
    Microphone,
    /// Camera
    Camera,
    /// Body sensors
    Sensors,
    /// External storage
    Storage,
    /// System settings
    Settings,
    /// Package installer privileges
    Installer,
    /// Package verifier privileges
    Verifier,
}

impl PermissionGroup {
    /// Permissions making up the group
    #[must_use]
    pub const fn permissions(self) -> &'static [&'static str] {
        match self {
            Self::Phone => &[
                READ_PHONE_STATE,
                CALL_PHONE,
                READ_CALL_LOG,
                WRITE_CALL_LOG,
                ADD_VOICEMAIL,
                USE_SIP,
                PROCESS_OUTGOING_CALLS,
            ],
            Self::Contacts => &[READ_CONTACTS, WRITE_CONTACTS],
            Self::Location => &[ACCESS_FINE_LOCATION, ACCESS_COARSE_LOCATION],
            Self::Calendar => &[READ_CALENDAR, WRITE_CALENDAR],
            Self::Sms => &[
                SEND_SMS,
                RECEIVE_SMS,
                READ_SMS,
                RECEIVE_WAP_PUSH,
                RECEIVE_MMS,
                READ_CELL_BROADCASTS,
            ],
            Self::Microphone => &[RECORD_AUDIO],
            Self::Camera => &[CAMERA],
            Self::Sensors => &[BODY_SENSORS],
            Self::Storage => &[READ_EXTERNAL_STORAGE, WRITE_EXTERNAL_STORAGE],
            Self::Settings => &[WRITE_SETTINGS],
            Self::Installer => &[
                GRANT_REVOKE_PERMISSIONS,
                INTERACT_ACROSS_USERS_FULL,
                CLEAR_APP_USER_DATA,
                KILL_UID,
            ],
            Self::Verifier => &[GRANT_REVOKE_PERMISSIONS],
        }
    }

    /// Whether `permission` belongs to the group
    #[must_use]
    pub fn contains(self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Well-known intents whose handlers receive default grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerIntent {
    /// Package archive installer activity
    Installer,
    /// Package verification receiver
    Verifier,
    /// Home screen, doubles as the setup wizard
    Home,
    /// Dialer
    Dial,
    /// Image capture
    Camera,
    /// Messaging app
    Messaging,
    /// Calendar app
    Calendar,
    /// Contacts app
    Contacts,
    /// Maps app
    Maps,
    /// Email app
    Email,
    /// Browser
    Browser,
}

impl HandlerIntent {
    /// Intent action
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Installer => "android.intent.action.INSTALL_PACKAGE",
            Self::Verifier => "android.intent.action.PACKAGE_NEEDS_VERIFICATION",
            Self::Dial => "android.intent.action.DIAL",
            Self::Camera => "android.media.action.IMAGE_CAPTURE",
            Self::Home
            | Self::Messaging
            | Self::Calendar
            | Self::Contacts
            | Self::Maps
            | Self::Email
            | Self::Browser => "android.intent.action.MAIN",
        }
    }

    /// Intent category, if the handler is selected by one
    #[must_use]
    pub const fn category(self) -> Option<&'static str> {
        match self {
            Self::Installer => Some("android.intent.category.DEFAULT"),
            Self::Home => Some("android.intent.category.HOME"),
            Self::Messaging => Some("android.intent.category.APP_MESSAGING"),
            Self::Calendar => Some("android.intent.category.APP_CALENDAR"),
            Self::Contacts => Some("android.intent.category.APP_CONTACTS"),
            Self::Maps => Some("android.intent.category.APP_MAPS"),
            Self::Email => Some("android.intent.category.APP_EMAIL"),
            Self::Browser => Some("android.intent.category.APP_BROWSER"),
            Self::Verifier | Self::Dial | Self::Camera => None,
        }
    }
}

/// Externally supplied package lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PackageProvider {
    /// Input methods
    InputMethod,
    /// Voice interaction services
    VoiceInteraction,
    /// Location providers
    Location,
}

impl PackageProvider {
    /// Every provider, in grant order
    pub const ALL: [Self; 3] = [Self::InputMethod, Self::VoiceInteraction, Self::Location];

    /// Runtime permission groups granted to the provided packages
    #[must_use]
    pub const fn groups(self) -> &'static [PermissionGroup] {
        use PermissionGroup::*;
        match self {
            Self::InputMethod => &[Contacts],
            Self::VoiceInteraction => &[Contacts, Calendar, Microphone, Phone, Sms, Location],
            Self::Location => &[
                Contacts, Calendar, Microphone, Phone, Sms, Location, Camera, Sensors, Storage,
            ],
        }
    }
}

/// Privileged handlers and the install permission group each one receives
pub const PRIVILEGED_HANDLER_GRANTS: [(HandlerIntent, PermissionGroup); 2] = [
    (HandlerIntent::Installer, PermissionGroup::Installer),
    (HandlerIntent::Verifier, PermissionGroup::Verifier),
];

/// Default handlers and the runtime permission groups each one receives
pub const DEFAULT_HANDLER_GRANTS: [(HandlerIntent, &[PermissionGroup]); 9] = {
    use PermissionGroup::*;
    [
        (HandlerIntent::Home, &[Phone, Contacts, Settings]),
        (HandlerIntent::Dial, &[Phone, Contacts, Sms, Microphone]),
        (HandlerIntent::Camera, &[Camera, Microphone]),
        (HandlerIntent::Messaging, &[Phone, Contacts, Sms]),
        (HandlerIntent::Calendar, &[Calendar, Contacts]),
        (HandlerIntent::Contacts, &[Contacts, Phone]),
        (HandlerIntent::Maps, &[Location]),
        (HandlerIntent::Email, &[Contacts]),
        (HandlerIntent::Browser, &[Location]),
    ]
};
