//! Power management and sleep modes

use core::marker::PhantomData;

use avrio_hal::{field_enum, register8, DataBus, Field, Flag, Mmio, Register8};

register8! {
    /// Sleep mode control register
    pub SMCR @ 0x53;
    /// MCU control register
    pub MCUCR @ 0x55;
    /// Power reduction register
    pub PRR @ 0x64;
}

field_enum! {
    /// Sleep mode entered by the SLEEP instruction (SM2:0). Reserved codes
    /// read back as `Idle`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum SleepMode: default Idle {
        Idle = 0,
        AdcNoiseReduction = 1,
        PowerDown = 2,
        PowerSave = 3,
        Standby = 6,
        ExtendedStandby = 7,
    }
}

type Sm<B> = Field<SMCR<B>, SleepMode, 1, 3>;
type Se<B> = Flag<SMCR<B>, 0>;

type Bods<B> = Flag<MCUCR<B>, 6>;
type Bodse<B> = Flag<MCUCR<B>, 5>;
type Pud<B> = Flag<MCUCR<B>, 4>;

type Prtwi<B> = Flag<PRR<B>, 7>;
type Prtim2<B> = Flag<PRR<B>, 6>;
type Prtim0<B> = Flag<PRR<B>, 5>;
type Prtim1<B> = Flag<PRR<B>, 3>;
type Prspi<B> = Flag<PRR<B>, 2>;
type Prusart0<B> = Flag<PRR<B>, 1>;
type Pradc<B> = Flag<PRR<B>, 0>;

/// Sleep control, brown-out detector sleep disable and power reduction.
#[derive(Debug, Clone, Copy)]
pub struct Power<B = Mmio>(PhantomData<fn() -> B>);

impl<B> Power<B> {
    /// Handle to the sleep and power reduction registers.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for Power<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: DataBus> Power<B> {
    /// SM2:0: mode entered by the next SLEEP.
    pub fn sleep_mode(&self) -> SleepMode {
        Sm::<B>::get()
    }

    /// Select the mode for the next SLEEP.
    pub fn set_sleep_mode(&self, mode: SleepMode) {
        Sm::<B>::set(mode);
    }

    /// SE: whether SLEEP has any effect.
    pub fn sleep_enabled(&self) -> bool {
        Se::<B>::get()
    }

    /// SE must be set for SLEEP to have any effect. Set it just before
    /// sleeping and clear it on wake-up.
    pub fn set_sleep_enabled(&self, enabled: bool) {
        Se::<B>::set(enabled);
    }

    /// BODS: the brown-out detector is off during power-down and
    /// power-save sleep.
    pub fn bod_sleep(&self) -> bool {
        Bods::<B>::get()
    }

    /// BODSE: enables writing BODS during the timed sequence.
    pub fn bod_sleep_enable(&self) -> bool {
        Bodse::<B>::get()
    }

    /// Timed sequence that turns the brown-out detector off for the next
    /// sleep: BODS and BODSE are written to one together, then BODS is
    /// written to one with BODSE cleared. BODS is only held for three clock
    /// cycles after that, so SLEEP has to follow immediately and interrupts
    /// should already be disabled.
    pub fn disable_bod_in_sleep(&self) {
        let base = MCUCR::<B>::read() & !(Bods::<B>::MASK | Bodse::<B>::MASK);
        MCUCR::<B>::write(base | Bods::<B>::MASK | Bodse::<B>::MASK);
        MCUCR::<B>::write(base | Bods::<B>::MASK);
    }

    /// PUD: disables every I/O pull-up regardless of DDRx and PORTx.
    pub fn pull_ups_disabled(&self) -> bool {
        Pud::<B>::get()
    }

    /// Set PUD.
    pub fn set_pull_ups_disabled(&self, disabled: bool) {
        Pud::<B>::set(disabled);
    }

    /// PRTWI: TWI clock stopped.
    pub fn twi_powered_down(&self) -> bool {
        Prtwi::<B>::get()
    }

    /// Stop or restart the TWI clock.
    pub fn set_twi_powered_down(&self, off: bool) {
        Prtwi::<B>::set(off);
    }

    /// PRTIM2: Timer2 clock stopped.
    pub fn timer2_powered_down(&self) -> bool {
        Prtim2::<B>::get()
    }

    /// Stop or restart the Timer2 clock.
    pub fn set_timer2_powered_down(&self, off: bool) {
        Prtim2::<B>::set(off);
    }

    /// PRTIM0: Timer0 clock stopped.
    pub fn timer0_powered_down(&self) -> bool {
        Prtim0::<B>::get()
    }

    /// Stop or restart the Timer0 clock.
    pub fn set_timer0_powered_down(&self, off: bool) {
        Prtim0::<B>::set(off);
    }

    /// PRTIM1: Timer1 clock stopped.
    pub fn timer1_powered_down(&self) -> bool {
        Prtim1::<B>::get()
    }

    /// Stop or restart the Timer1 clock.
    pub fn set_timer1_powered_down(&self, off: bool) {
        Prtim1::<B>::set(off);
    }

    /// PRSPI: SPI clock stopped.
    pub fn spi_powered_down(&self) -> bool {
        Prspi::<B>::get()
    }

    /// Powering the SPI down requires re-initialising it afterwards.
    pub fn set_spi_powered_down(&self, off: bool) {
        Prspi::<B>::set(off);
    }

    /// PRUSART0: USART0 clock stopped.
    pub fn usart0_powered_down(&self) -> bool {
        Prusart0::<B>::get()
    }

    /// Powering USART0 down requires re-initialising it afterwards.
    pub fn set_usart0_powered_down(&self, off: bool) {
        Prusart0::<B>::set(off);
    }

    /// PRADC: ADC clock stopped.
    pub fn adc_powered_down(&self) -> bool {
        Pradc::<B>::get()
    }

    /// The ADC must be disabled (ADEN cleared) before it is powered down.
    pub fn set_adc_powered_down(&self, off: bool) {
        Pradc::<B>::set(off);
    }
}
