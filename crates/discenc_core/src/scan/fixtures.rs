//! Probe logs shared by tests.

/// Two-title DVD scan with an unchecked audio stream and closed captions.
pub const DVD_SCAN: &str = "\
[14:02:11] hb_init: starting libhb thread
[14:02:11] scan: DVD has 2 title(s)
[14:02:11] scan: scanning title 1
[14:02:11] scan: opening IFO for VTS 1
[14:02:11] scan: vts=1, ttn=1, cells=0->12, blocks=0->2087134, 2087135 blocks
[14:02:11] scan: checking audio 1
[14:02:11] scan: id=0x80bd, lang=English (AC3), 3cc=eng ext=0
[14:02:11] scan: checking audio 2
[14:02:11] scan: id=0x81bd, lang=English (AC3), 3cc=eng ext=0
[14:02:11] scan: checking audio 3
[14:02:11] scan: checking subtitle 1
[14:02:11] scan: id=0x20bd, lang=English, 3cc=eng ext=0
[14:02:11] scan: checking subtitle 2
[14:02:12] scan: decoding previews for title 1
[14:02:12] scan: audio 0x80bd: ac3, rate=48000Hz, bitrate=448000 English (AC3) (5.1 ch)
[14:02:12] scan: audio 0x81bd: ac3, rate=48000Hz, bitrate=192000 English (AC3) (2.0 ch)
[14:02:14] scan: 10 previews, 720x480, 29.970 fps, autocrop = 0/0/8/8, aspect 16:9, PAR 32:27
[14:02:14] scan: scanning title 2
[14:02:14] scan: vts=2, ttn=1, cells=0->0, blocks=0->1000, 1001 blocks
[14:02:14] scan: checking audio 1
[14:02:14] scan: id=0x80bd, lang=French (AC3), 3cc=fre ext=0
[14:02:14] scan: decoding previews for title 2
[14:02:14] scan: audio 0x80bd: ac3, rate=48000Hz, bitrate=192000 French (AC3) (2.0 ch)
[14:02:14] scan: audio 0x82bd: ac3, rate=48000Hz, bitrate=192000 Unknown (AC3) (2.0 ch)
[14:02:15] scan: 10 previews, 720x480, 29.970 fps, autocrop = 0/0/0/0, aspect 4:3, PAR 8:9
+ title 1:
  + Main Feature
  + vts 1, ttn 1, cells 0->12 (2087135 blocks)
  + duration: 01:31:40
  + size: 720x480, pixel aspect: 32/27, display aspect: 1.78, 29.970 fps
  + autocrop: 0/0/8/8
  + chapters:
    + 1: cells 0->0, 95821 blocks, duration 00:04:12
  + audio tracks:
    + 1, English (AC3) (5.1 ch) (iso639-2: eng), 48000Hz, 448000bps
    + 2, English (AC3) (2.0 ch) (iso639-2: eng), 48000Hz, 192000bps
    + 3, Espanol (AC3) (2.0 ch) (iso639-2: spa), 48000Hz, 192000bps
  + subtitle tracks:
    + 1, English (iso639-2: eng) (Bitmap)(VOBSUB)
    + 2, Espanol (iso639-2: spa) (Bitmap)(VOBSUB)
    + 3, Closed Captions (iso639-2: eng) (Text)(CC)
+ title 2:
  + vts 2, ttn 1, cells 0->0 (1001 blocks)
  + duration: 00:02:30
  + size: 720x480, pixel aspect: 8/9, display aspect: 1.33, 29.970 fps
  + autocrop: 0/0/0/0
  + audio tracks:
    + 1, Francais (AC3) (2.0 ch) (iso639-2: fre), 48000Hz, 192000bps
  + subtitle tracks:
HandBrake has exited.
";

/// Four-file directory scan.
pub const DIRECTORY_SCAN: &str = "\
[09:00:00] hb_scan: path=/media/show, title_index=0
[09:00:00] scan: scanning title 1
Input #0, matroska,webm, from '/media/show/01 - Opening.mkv':
  Duration: 00:03:10.00, start: 0.000000, bitrate: 2100 kb/s
    Stream #0.0(eng): Video: h264, yuv420p, 720x480, 29.97 fps
    Stream #0.1(eng): Audio: aac, 48000 Hz, stereo, s16, 160 kb/s
[09:00:01] scan: decoding previews for title 1
[09:00:01] scan: scanning title 2
Input #0, matroska,webm, from '/media/show/02 - Pilot.mkv':
    Stream #0.0(eng): Video: h264, yuv420p, 1920x1080, 23.98 fps
    Stream #0.1(eng): Audio: ac3, 48000 Hz, 5.1, s16, 448 kb/s (default)
    Stream #0.2(jpn): Audio: aac (LC), 48000 Hz, stereo, fltp, 192 kb/s
    Stream #0.3(eng): Subtitle: dvd_subtitle
[09:00:02] scan: decoding previews for title 2
[09:00:02] scan: scanning title 3
Input #0, matroska,webm, from '/media/show/Extras_t07.mkv':
    Stream #0:1(eng): Audio: aac, 44100 Hz, stereo, fltp, 128 kb/s
[09:00:02] scan: decoding previews for title 3
[09:00:03] scan: scanning title 4
Input #0, matroska,webm, from '/media/show/Bloopers.mkv':
    Stream #0.1: Audio: mp3, 44100 Hz, stereo, s16p, 128 kb/s
[09:00:03] scan: decoding previews for title 4
+ title 1:
  + stream: /media/show/01 - Opening.mkv
  + duration: 00:03:10
  + size: 720x480, pixel aspect: 8/9, display aspect: 1.33, 29.970 fps
  + autocrop: 0/0/0/0
  + audio tracks:
    + 1, English (AAC) (2.0 ch) (iso639-2: eng), 48000Hz, 160000bps
  + subtitle tracks:
+ title 2:
  + stream: /media/show/02 - Pilot.mkv
  + duration: 00:44:12
  + size: 1920x1080, pixel aspect: 1/1, display aspect: 1.78, 23.976 fps
  + autocrop: 0/0/0/0
  + audio tracks:
    + 1, English (AC3) (5.1 ch) (iso639-2: eng), 48000Hz, 448000bps
    + 2, Japanese (AAC) (2.0 ch) (iso639-2: jpn), 48000Hz, 192000bps
  + subtitle tracks:
    + 1, English (iso639-2: eng) (Bitmap)(VOBSUB)
+ title 3:
  + stream: /media/show/Extras_t07.mkv
  + duration: 00:05:00
  + size: 720x480, pixel aspect: 8/9, display aspect: 1.33, 29.970 fps
  + audio tracks:
    + 1, English (AAC) (2.0 ch) (iso639-2: eng), 44100Hz, 128000bps
+ title 4:
  + stream: /media/show/Bloopers.mkv
  + duration: 00:02:00
  + size: 720x480, pixel aspect: 8/9, display aspect: 1.33, 29.970 fps
";
