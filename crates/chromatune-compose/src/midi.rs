//! Standard MIDI File serialization of a [`Score`].
//!
//! Format 1, PPQ 480. Track 0 carries the tempo and time signature; each
//! part gets its own track with a name, program change, and note events.
//! Channels are allocated in part order, skipping the percussion channel.

use crate::score::{Part, Score};

/// Pulses per quarter note.
pub const PPQ: u16 = 480;

/// Serialize a score to Standard MIDI File format 1 bytes.
pub fn score_to_midi(score: &Score) -> Vec<u8> {
    let mut tracks: Vec<Vec<u8>> = vec![build_tempo_track(score.bpm)];

    let mut channel_alloc = 0u8;
    for part in &score.parts {
        let channel = allocate_channel(&mut channel_alloc);
        tracks.push(build_part_track(part, channel));
    }

    build_midi_file(PPQ, &tracks)
}

/// Next free channel, skipping 9 (GM percussion), capped at 15.
fn allocate_channel(alloc: &mut u8) -> u8 {
    let channel = *alloc;
    *alloc += 1;
    if *alloc == 9 {
        *alloc = 10;
    }
    channel.min(15)
}

fn build_tempo_track(bpm: u32) -> Vec<u8> {
    let usec: u32 = 60_000_000 / bpm.max(1);
    let mut track_data = Vec::new();

    // Tempo meta at tick 0
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[
        0xFF,
        0x51,
        0x03,
        (usec >> 16) as u8,
        (usec >> 8) as u8,
        usec as u8,
    ]);

    // 4/4 time signature
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x58, 0x04, 4, 2, 0x18, 0x08]);

    // End of track
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

fn build_part_track(part: &Part, channel: u8) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();

    // Track name
    let name_bytes = part.instrument.as_bytes();
    let mut name_event = vec![0xFF, 0x03];
    write_vlq(&mut name_event, name_bytes.len() as u32);
    name_event.extend_from_slice(name_bytes);
    events.push((0, name_event));

    // Program change
    events.push((0, vec![0xC0 | (channel & 0x0F), part.program]));

    let mut beat_cursor = 0.0f64;
    for note in &part.events {
        let onset = beats_to_ticks(beat_cursor);
        let offset = beats_to_ticks(beat_cursor + note.beats);
        for &pitch in &note.pitches {
            events.push((onset, vec![0x90 | (channel & 0x0F), pitch, note.velocity]));
            events.push((offset, vec![0x80 | (channel & 0x0F), pitch, 0]));
        }
        beat_cursor += note.beats;
    }

    // Sort by tick, note-offs before note-ons at the same tick
    events.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let a_is_off = a.1.first().is_some_and(|s| s & 0xF0 == 0x80);
            let b_is_off = b.1.first().is_some_and(|s| s & 0xF0 == 0x80);
            b_is_off.cmp(&a_is_off)
        })
    });

    let mut track_data = Vec::new();
    let mut last_tick = 0u64;
    for (tick, data) in events {
        let delta = tick.saturating_sub(last_tick);
        write_vlq(&mut track_data, delta as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

fn beats_to_ticks(beats: f64) -> u64 {
    (beats * PPQ as f64).round() as u64
}

/// Assemble a complete MIDI file from track data blobs.
fn build_midi_file(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // format 1
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        buf.push(0);
        return;
    }

    let mut bytes = Vec::new();
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}
