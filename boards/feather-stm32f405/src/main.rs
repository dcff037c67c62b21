#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod eth;
mod network;
mod sensors;
mod time;
mod tls_buffers;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Root CA the CSE's certificate must chain to
const ROOT_CA_PEM: &str = include_str!("../certs/root_ca.pem");

/// Uploader settings; the CSE URL can be overridden at build time.
fn uploader_config() -> m2m_core::Config {
    let mut config = m2m_core::Config::default();
    if let Some(base_url) = option_env!("M2M_BASE_URL") {
        config.server.base_url = base_url;
    }
    config
}

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use defmt::{error, info};
    use embassy_futures::join::join4;
    use embassy_stm32::adc::{Adc, AdcChannel};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Flex, Level, Output, Pull, Speed};
    use embassy_stm32::i2c::{self, I2c};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode, LsConfig, LseConfig, LseMode};
    use embassy_stm32::rng::Rng;
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use m2m_core::{establish, Sensors, TelemetryClient, TimeBase, UploadController, WaterLevel};

    use network::{EthernetLink, NetworkConfig, SntpClient, SntpConfig, SntpTrigger, TlsConnector};
    use sensors::{bh1750, Bh1750, Ds18b20, WaterProbe};
    use time::{MonoClock, RtcClock};

    type Peri<T> = embassy_stm32::Peri<'static, T>;

    struct NetworkPeripherals {
        spi: Peri<peripherals::SPI2>,
        sck: Peri<peripherals::PB13>,
        mosi: Peri<peripherals::PB15>,
        miso: Peri<peripherals::PB14>,
        cs: Peri<peripherals::PC6>,
        reset: Peri<peripherals::PC3>,
        int: Peri<peripherals::PC2>,
        exti: Peri<peripherals::EXTI2>,
        dma_tx: Peri<peripherals::DMA1_CH4>,
        dma_rx: Peri<peripherals::DMA1_CH3>,
        rng: Peri<peripherals::RNG>,
    }

    struct SensorPeripherals {
        i2c: Peri<peripherals::I2C1>,
        scl: Peri<peripherals::PB6>,
        sda: Peri<peripherals::PB7>,
        i2c_tx_dma: Peri<peripherals::DMA1_CH6>,
        i2c_rx_dma: Peri<peripherals::DMA1_CH0>,
        one_wire: Peri<peripherals::PC7>,
        adc: Peri<peripherals::ADC1>,
        water: Peri<peripherals::PA4>,
    }

    embassy_stm32::bind_interrupts!(struct RngIrqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
    });

    embassy_stm32::bind_interrupts!(struct I2cIrqs {
        I2C1_EV => i2c::EventInterruptHandler<peripherals::I2C1>;
        I2C1_ER => i2c::ErrorInterruptHandler<peripherals::I2C1>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("oneM2M sensor uploader starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE, 32.768 kHz LSE (PC14/PC15)
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz (RNG)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        config.rcc.ls = LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz(32_768),
                mode: LseMode::Oscillator(embassy_stm32::rcc::LseDrive::MediumHigh),
            }),
        };

        let p = embassy_stm32::init(config);
        info!("System initialized: SYSCLK=84MHz, PLLQ=48MHz for RNG");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        Mono::start(84_000_000);

        time::init_time_system(p.RTC);

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
            rng: p.RNG,
        };

        let sensor_periph = SensorPeripherals {
            i2c: p.I2C1,
            scl: p.PB6,
            sda: p.PB7,
            i2c_tx_dma: p.DMA1_CH6,
            i2c_rx_dma: p.DMA1_CH0,
            one_wire: p.PC7,
            adc: p.ADC1,
            water: p.PA4,
        };

        heartbeat::spawn().ok();
        network_task::spawn(net_periph, sensor_periph).ok();

        (Shared {}, Local { led })
    }

    /// Heartbeat task
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        loop {
            cx.local.led.set_high();
            Mono::delay(100.millis()).await;
            cx.local.led.set_low();
            Mono::delay(4900.millis()).await;
        }
    }

    /// Network task: W5500 and stack runners, SNTP service and the uploader
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        periph: NetworkPeripherals,
        sensor_periph: SensorPeripherals,
    ) -> ! {
        use embassy_net::StackResources;
        use static_cell::StaticCell;

        let net_config = NetworkConfig::default();

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let eth_periph = eth::EthPeripherals {
            spi,
            cs: Output::new(periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(periph.reset, Level::High, Speed::Low),
            int: ExtiInput::new(periph.int, periph.exti, Pull::Up),
        };

        let Some((device, w5500_runner)) =
            eth::init_w5500(eth_periph, net_config.mac_addr).await
        else {
            park().await
        };

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            embassy_net::Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        info!("Network stack initialized with DHCP");

        let sntp = SntpClient::new(SntpConfig::default());
        let rng_periph = periph.rng;

        let uploader = async move {
            let config = uploader_config();
            if let Err(e) = config.validate() {
                error!("Invalid uploader configuration: {}", e);
                park().await
            }

            let mut link = EthernetLink::new(stack, net_config.dhcp_wait_ms);
            let mut time_base = TimeBase::new(RtcClock, MonoClock, config.time);
            let startup = establish(
                &mut link,
                &mut MonoClock,
                &mut time_base,
                &mut SntpTrigger,
                &config,
            )
            .await;
            info!("Startup complete: {}", startup);

            let rng = Rng::new(rng_periph, RngIrqs);
            let connector = TlsConnector::new(
                stack,
                rng,
                tls_buffers::take(),
                net_config.tcp_timeout_ms,
            );
            let client = match TelemetryClient::from_config(connector, &config.server, ROOT_CA_PEM)
            {
                Ok(client) => client,
                Err(e) => {
                    error!("Cannot build telemetry client: {}", e);
                    park().await
                }
            };

            let mut i2c_config = i2c::Config::default();
            i2c_config.frequency = Hertz(100_000);
            let i2c = I2c::new(
                sensor_periph.i2c,
                sensor_periph.scl,
                sensor_periph.sda,
                I2cIrqs,
                sensor_periph.i2c_tx_dma,
                sensor_periph.i2c_rx_dma,
                i2c_config,
            );
            let mut light = Bh1750::new(i2c, bh1750::ADDRESS_LOW);
            light.init(&mut MonoClock).await;

            let temperature = Ds18b20::new(Flex::new(sensor_periph.one_wire), MonoClock);
            let water_level = WaterLevel::new(WaterProbe::new(
                Adc::new(sensor_periph.adc),
                sensor_periph.water.degrade_adc(),
            ));

            let sensors = Sensors {
                light,
                temperature,
                water_level,
            };
            let mut controller =
                UploadController::new(client, sensors, MonoClock, MonoClock, &config.upload);
            controller.run().await
        };

        join4(
            w5500_runner.run(),
            net_runner.run(),
            sntp.serve(stack),
            uploader,
        )
        .await;
    }

    /// Stop here after an unrecoverable setup failure; the heartbeat keeps
    /// blinking.
    async fn park() -> ! {
        loop {
            Mono::delay(60.secs()).await;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
