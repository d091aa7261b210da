use ffmpeg_next::Packet;

/// Releases the packet's payload so the same packet can receive the next one.
pub fn reset(packet: &mut Packet) {
    unsafe { ffmpeg_next::ffi::av_packet_unref(packet.as_mut_ptr()) };
}

/// Timing of one packet as stored in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketTiming {
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub is_key: bool,
}

impl From<&Packet> for PacketTiming {
    fn from(packet: &Packet) -> Self {
        Self {
            pts: packet.pts(),
            dts: packet.dts(),
            duration: packet.duration(),
            is_key: packet.is_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_payload_and_timing() {
        let mut packet = Packet::copy(&[0u8, 0, 0, 1, 0x65]);
        packet.set_pts(Some(40));
        packet.set_dts(Some(40));
        assert_eq!(packet.size(), 5);

        reset(&mut packet);
        assert_eq!(packet.size(), 0);
        assert_eq!(packet.pts(), None);
        assert_eq!(PacketTiming::from(&packet).dts, None);
    }
}
