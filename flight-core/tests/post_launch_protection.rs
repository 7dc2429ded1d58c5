//! Property tests for the flash log's launch protection.
//!
//! Whatever was logged before launch and however much is logged after it,
//! the writer must never wrap back into the window kept at launch.

use flight_core::data_point::DataPoint;
use flight_core::data_saver::{
    DATA_START_ADDRESS, DataSaver, FlashDataSaver, FlashDataSaverConfig, FlashDataSaverError,
    PAGE_SIZE, SECTOR_SIZE, SimulatedFlash, SimulatedFlashError,
};
use proptest::prelude::*;

const FLASH_SIZE: u32 = 32 * 1024;
const USABLE: u32 = FLASH_SIZE - DATA_START_ADDRESS;

type Saver = FlashDataSaver<SimulatedFlash>;
type SaverError = FlashDataSaverError<SimulatedFlashError>;

/// Forward distance from `from` to `to` inside the data region.
fn distance(from: u32, to: u32) -> u32 {
    (to + USABLE - from) % USABLE
}

fn log(saver: &mut Saver, count: u32, start_ms: u32) -> Result<(), SaverError> {
    for i in 0..count {
        saver.save_data_point(DataPoint::new(start_ms + i * 10, i as f32), 8)?;
    }
    Ok(())
}

fn launched_saver(before: u32, data_points_per_minute: u32) -> Saver {
    let config = FlashDataSaverConfig {
        data_points_per_minute,
        ..Default::default()
    };
    let mut saver = FlashDataSaver::new(SimulatedFlash::new(FLASH_SIZE), config);
    saver.begin().unwrap();
    log(&mut saver, before, 0).unwrap();
    saver
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn launch_window_is_never_overwritten(
        before in 0u32..15_000,
        data_points_per_minute in 0u32..8_000,
        after in 0u32..15_000,
    ) {
        let mut saver = launched_saver(before, data_points_per_minute);
        let next_at_launch = saver.next_write_address();
        saver.launch_detected(before * 10).unwrap();

        let launch = saver.launch_write_address();
        prop_assert_eq!(launch % SECTOR_SIZE, 0);
        prop_assert!((DATA_START_ADDRESS..FLASH_SIZE).contains(&launch));

        let kept = distance(launch, next_at_launch);
        let protected: Vec<u8> = (0..kept)
            .map(|offset| {
                let address = DATA_START_ADDRESS + (launch - DATA_START_ADDRESS + offset) % USABLE;
                saver.flash().memory()[address as usize]
            })
            .collect();
        saver.flash_mut().clear_history();

        let result = log(&mut saver, after, before * 10 + 10).and_then(|_| saver.flush_buffer());

        let guard_end = launch + 2 * PAGE_SIZE as u32;
        for write in saver.flash().writes() {
            prop_assert!(
                write.end <= launch || write.start >= guard_end,
                "write {:?} inside the guard pages at {:#x}",
                write,
                launch
            );
            let start = distance(launch, write.start);
            prop_assert!(start >= kept, "write {:?} inside the launch window", write);
            prop_assert!(
                start + (write.end - write.start) <= USABLE - PAGE_SIZE as u32,
                "write {:?} wrapped up to launch at {:#x}",
                write,
                launch
            );
        }
        for erase in saver.flash().erases() {
            let start = distance(launch, erase.start);
            prop_assert!(start >= kept && start + SECTOR_SIZE <= USABLE, "erase {:?}", erase);
        }
        for (offset, byte) in protected.iter().enumerate() {
            let address = DATA_START_ADDRESS + (launch - DATA_START_ADDRESS + offset as u32) % USABLE;
            prop_assert_eq!(saver.flash().memory()[address as usize], *byte, "{:#x}", address);
        }

        if let Err(error) = result {
            prop_assert_eq!(error, FlashDataSaverError::ChipFullDueToPostLaunchProtection);
            prop_assert!(saver.is_chip_full_due_to_post_launch_protection());

            // the latch is silent from here on and nothing reaches the chip
            let writes = saver.flash().writes().len();
            for i in 0..200 {
                prop_assert_eq!(saver.save_data_point(DataPoint::new(i, 0.0), 8), Ok(()));
            }
            prop_assert_eq!(saver.flush_buffer(), Ok(()));
            prop_assert_eq!(saver.flash().writes().len(), writes);
            prop_assert!(saver.flash().erases().iter().all(|erase| erase.start != launch));
        }
    }

    #[test]
    fn reboot_restores_launch_window(
        before in 0u32..15_000,
        data_points_per_minute in 0u32..8_000,
    ) {
        let mut saver = launched_saver(before, data_points_per_minute);
        saver.launch_detected(before * 10).unwrap();
        let launch = saver.launch_write_address();

        let mut rebooted = FlashDataSaver::new(saver.into_flash(), FlashDataSaverConfig::default());
        rebooted.begin().unwrap();
        prop_assert!(rebooted.rebooted_in_post_launch_mode());
        prop_assert_eq!(rebooted.launch_write_address(), launch);
        prop_assert_eq!(
            rebooted.save_data_point(DataPoint::new(0, 1.0), 8),
            Err(FlashDataSaverError::RebootedInPostLaunchMode)
        );
    }
}

#[test]
fn filling_the_chip_after_launch_latches_full() {
    let mut saver = launched_saver(100, 0);
    saver.launch_detected(1000).unwrap();

    // far more than the chip holds
    let result = log(&mut saver, 20_000, 1010);
    assert_eq!(
        result,
        Err(FlashDataSaverError::ChipFullDueToPostLaunchProtection)
    );
    assert!(saver.is_chip_full_due_to_post_launch_protection());
    let remaining = distance(saver.next_write_address(), saver.launch_write_address());
    assert!(remaining < 2 * PAGE_SIZE as u32);

    let next = saver.next_write_address();
    log(&mut saver, 1_000, 300_000).unwrap();
    assert_eq!(saver.next_write_address(), next);
}
