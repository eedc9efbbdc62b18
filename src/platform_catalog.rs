/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hardware constant catalogue and `create_platform` generator.
//!
//! Constants are carried over verbatim from the reference platform
//! generator (see SPEC_FULL.md §4.11) — they describe one realistic
//! desktop/workstation-class heterogeneous node (CPU + GPU + N FPGAs).

use crate::platform::{Memory, Platform, Processor};

const GLOBAL_WORD_LENGTH: f64 = 4.0;

const CPU_CLOCK_RATE: f64 = 2900.0;
const CPU_CORE_NUMBER: f64 = 16.0;
const CPU_DATA_PARALLELISM: f64 = 1.0;

const MAIN_RAM_TRANSFER_RATE: f64 = 2667.0;
const MAIN_RAM_WIDTH: f64 = 8.0;
const MAIN_RAM_CHANNELS: f64 = 2.0;

const GPU_CLOCK_RATE: f64 = 1471.0;
const GPU_CORE_NUMBER: f64 = 3584.0;
const GPU_PENALTY: f64 = 12.0 / 5.0;

const GPU_RAM_TRANSFER_RATE: f64 = 800.0;
const GPU_RAM_WIDTH: f64 = 256.0;
const GPU_RAM_CHANNELS: f64 = 1.0;

const FPGA_STREAMING_RATE: f64 = 400.0;
const FPGA_CAPACITY: f64 = 128.0;
const FPGA_RAM_TRANSFER_RATE: f64 = 1600.0;
const FPGA_RAM_WIDTH: f64 = 8.0;
const FPGA_RAM_CHANNELS: f64 = 1.5;

fn memory_rate_mbps(transfer_rate: f64, width: f64, channels: f64) -> f64 {
    transfer_rate * width * channels / 1000.0
}

/// Builds the catalogue platform with `n_fpgas` FPGA(+FPGA_RAM) pairs.
///
/// When `n_fpgas > 1` FPGA labels get a numeric suffix (`FPGA0`, `FPGA1`,
/// ...); for `n_fpgas == 1` the original source still suffixes with `0` —
/// preserved here for consistency with the reference `.graph`/`.gv` export
/// labels, which always include the index.
pub fn create_platform(n_fpgas: u32) -> Platform {
    let mut platform = Platform::new();

    let main_ram_rate = memory_rate_mbps(MAIN_RAM_TRANSFER_RATE, MAIN_RAM_WIDTH, MAIN_RAM_CHANNELS);
    let main_ram = platform.add_memory(Memory {
        label: "Main_RAM".into(),
        streaming_allowed: true,
        data_rate: main_ram_rate,
    });

    let cpu_serial_rate = CPU_CLOCK_RATE * CPU_CORE_NUMBER / GLOBAL_WORD_LENGTH;
    let cpu_parallel_rate = cpu_serial_rate * CPU_DATA_PARALLELISM;
    let cpu = platform.add_processor(Processor {
        label: "CPU".into(),
        streaming_allowed: false,
        serial_rate: cpu_serial_rate,
        parallel_rate: cpu_parallel_rate,
        capacity: f64::INFINITY,
        default_memory: main_ram,
    });

    let gpu_ram_rate = memory_rate_mbps(GPU_RAM_TRANSFER_RATE, GPU_RAM_WIDTH, GPU_RAM_CHANNELS);
    let gpu_ram = platform.add_memory(Memory {
        label: "GPU_RAM".into(),
        streaming_allowed: true,
        data_rate: gpu_ram_rate,
    });

    let gpu_serial_rate = GPU_CLOCK_RATE * GPU_CORE_NUMBER / GLOBAL_WORD_LENGTH / GPU_PENALTY;
    let gpu_parallel_rate = GPU_CLOCK_RATE * GPU_CORE_NUMBER / GLOBAL_WORD_LENGTH;
    let gpu = platform.add_processor(Processor {
        label: "GPU".into(),
        streaming_allowed: false,
        serial_rate: gpu_serial_rate,
        parallel_rate: gpu_parallel_rate,
        capacity: f64::INFINITY,
        default_memory: gpu_ram,
    });

    platform.set_data_connection(cpu, main_ram, main_ram_rate);
    platform.set_data_connection(gpu, gpu_ram, gpu_ram_rate);
    platform.set_data_connection(main_ram, gpu_ram, main_ram_rate.min(gpu_ram_rate));

    let fpga_ram_rate = memory_rate_mbps(FPGA_RAM_TRANSFER_RATE, FPGA_RAM_WIDTH, FPGA_RAM_CHANNELS);

    for i in 0..n_fpgas {
        let fpga_ram = platform.add_memory(Memory {
            label: format!("FPGA_RAM{}", i),
            streaming_allowed: true,
            data_rate: fpga_ram_rate,
        });
        let fpga = platform.add_processor(Processor {
            label: format!("FPGA{}", i),
            streaming_allowed: true,
            serial_rate: FPGA_STREAMING_RATE,
            parallel_rate: FPGA_STREAMING_RATE,
            capacity: FPGA_CAPACITY,
            default_memory: fpga_ram,
        });

        platform.set_data_connection(
            fpga,
            fpga_ram,
            FPGA_STREAMING_RATE * 32.0 * 1.0 * 7.0 / 8.0,
        );
        platform.set_data_connection(main_ram, fpga_ram, FPGA_STREAMING_RATE * 64.0 * 1.0 / 8.0);
    }

    platform
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fpgas_has_only_cpu_and_gpu() {
        let p = create_platform(0);
        assert_eq!(p.processors().count(), 2);
        assert_eq!(p.memories().count(), 2);
    }

    #[test]
    fn two_fpgas_get_numeric_suffixes() {
        let p = create_platform(2);
        assert!(p.find_processor_by_label("FPGA0").is_some());
        assert!(p.find_processor_by_label("FPGA1").is_some());
        assert!(p.find_memory_by_label("FPGA_RAM0").is_some());
        assert!(p.find_memory_by_label("FPGA_RAM1").is_some());
    }

    #[test]
    fn cpu_main_ram_rate_is_symmetric() {
        let p = create_platform(0);
        let cpu = p.find_processor_by_label("CPU").unwrap();
        let ram = p.find_memory_by_label("Main_RAM").unwrap();
        assert_eq!(p.transfer_rate_mbps(cpu, ram), p.transfer_rate_mbps(ram, cpu));
        assert!(p.transfer_rate_mbps(cpu, ram) > 0.0);
    }

    #[test]
    fn fpga_processor_has_finite_capacity_and_streaming_allowed() {
        let p = create_platform(1);
        let fpga = p.find_processor_by_label("FPGA0").unwrap();
        let proc = p.processor(fpga);
        assert!(proc.streaming_allowed);
        assert_eq!(proc.capacity, FPGA_CAPACITY);
    }

    #[test]
    fn cpu_processing_rate_matches_s1_scenario() {
        let p = create_platform(0);
        let cpu = p.find_processor_by_label("CPU").unwrap();
        let t = p.processor(cpu).processing_time_ms(1.0, 100.0);
        assert!((t - 1000.0 / 11600.0).abs() < 1e-6);
    }
}
