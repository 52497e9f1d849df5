//! Service class UUIDs
//!
//! The remote service UUIDs reported by the adapter decide whether a device is
//! treated as an audio sink. 16-bit SIG assigned service classes are expanded
//! over the Bluetooth Base UUID `00000000-0000-1000-8000-00805F9B34FB`.

/// 128-bit service UUID
pub type ServiceUuid = u128;

/// Bluetooth Base UUID
pub const BASE_UUID: ServiceUuid = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Service Class Identifiers relevant to audio devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ServiceClassId {
    /// Headset Profile
    Headset = 0x1108,
    /// Audio Source
    AudioSource = 0x110A,
    /// Audio Sink
    AudioSink = 0x110B,
    /// A/V Remote Control Target
    AvRemoteControlTarget = 0x110C,
    /// Advanced Audio Distribution Profile
    AdvancedAudioDistribution = 0x110D,
    /// A/V Remote Control
    AvRemoteControl = 0x110E,
    /// Hands-Free Profile
    HandsFree = 0x111E,
    /// Hands-Free Audio Gateway
    HandsFreeAudioGateway = 0x111F,
}

impl ServiceClassId {
    /// Convert to 128-bit UUID
    #[must_use]
    pub const fn to_uuid(self) -> ServiceUuid {
        BASE_UUID | ((self as u16 as ServiceUuid) << 96)
    }

    /// Check whether `uuid` is this service class
    #[must_use]
    pub const fn matches(self, uuid: ServiceUuid) -> bool {
        uuid == self.to_uuid()
    }
}

/// The device can receive streamed audio
#[must_use]
pub const fn is_audio_sink(uuid: ServiceUuid) -> bool {
    ServiceClassId::AudioSink.matches(uuid)
}

/// The device can send streamed audio
#[must_use]
pub const fn is_audio_source(uuid: ServiceUuid) -> bool {
    ServiceClassId::AudioSource.matches(uuid)
}

/// The device advertises the generic A2DP class
#[must_use]
pub const fn is_adv_audio_dist(uuid: ServiceUuid) -> bool {
    ServiceClassId::AdvancedAudioDistribution.matches(uuid)
}

/// Any A2DP role: sink, source or the generic distribution class
#[must_use]
pub const fn is_a2dp(uuid: ServiceUuid) -> bool {
    is_audio_sink(uuid) || is_audio_source(uuid) || is_adv_audio_dist(uuid)
}
